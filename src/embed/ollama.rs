//! Ollama embeddings via `POST /api/embed`.

use std::time::Duration;

use serde_json::json;

use crate::config::EmbeddingBackend;
use crate::embed::{Embedder, check_count, parse_vector};
use crate::error::CollaboratorError;
use crate::http::JsonClient;

pub struct OllamaEmbedder {
    client: JsonClient,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, batch_size: usize, timeout: Duration) -> Self {
        Self {
            client: JsonClient::new("ollama", timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({ "model": self.model, "input": texts });
        let resp = self.client.post(&url, &[], &body)?;

        let vectors = resp["embeddings"]
            .as_array()
            .and_then(|list| list.iter().map(parse_vector).collect::<Option<Vec<_>>>())
            .ok_or_else(|| CollaboratorError::MalformedResponse {
                service: self.client.service().into(),
                message: "missing or non-numeric 'embeddings' field".into(),
            })?;
        check_count(self.client.service(), texts.len(), &vectors)?;
        Ok(vectors)
    }
}

impl Embedder for OllamaEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_batch(batch)?);
        }
        Ok(vectors)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| CollaboratorError::MalformedResponse {
            service: self.client.service().into(),
            message: "no embedding returned for query".into(),
        })
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Ollama
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_server_is_unavailable() {
        let embedder = OllamaEmbedder::new(
            "http://127.0.0.1:1/",
            "nomic-embed-text",
            10,
            Duration::from_secs(2),
        );
        let err = embedder.embed_query("hello").unwrap_err();
        assert!(matches!(err, CollaboratorError::Unavailable { .. }));
    }
}
