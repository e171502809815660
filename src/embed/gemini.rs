//! Gemini embeddings via the Generative Language REST API.
//!
//! Documents go through `batchEmbedContents` with task type
//! `RETRIEVAL_DOCUMENT`; the query through `embedContent` with
//! `RETRIEVAL_QUERY`. The API key travels as the `key` query parameter.

use std::time::Duration;

use serde_json::{Value, json};

use crate::config::EmbeddingBackend;
use crate::embed::{Embedder, check_count, parse_vector};
use crate::error::CollaboratorError;
use crate::http::JsonClient;

pub struct GeminiEmbedder {
    client: JsonClient,
    base_url: String,
    /// Always in `models/<name>` form.
    model: String,
    api_key: String,
    batch_size: usize,
}

impl GeminiEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client: JsonClient::new("gemini", timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model_path(model),
            api_key,
            batch_size: batch_size.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, text: &str, task_type: &str) -> Value {
        json!({
            "model": self.model,
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type,
        })
    }

    fn call(&self, method: &str, body: &Value) -> Result<Value, CollaboratorError> {
        let url = format!("{}/{}:{method}", self.base_url, self.model);
        tracing::debug!(url = url.as_str(), "sending Gemini embedding request");
        self.client.post(&url, &[("key", self.api_key.as_str())], body)
    }

    fn malformed(&self, message: &str) -> CollaboratorError {
        CollaboratorError::MalformedResponse {
            service: self.client.service().into(),
            message: message.to_string(),
        }
    }
}

impl Embedder for GeminiEmbedder {
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollaboratorError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let requests: Vec<Value> = batch
                .iter()
                .map(|t| self.request(t, "RETRIEVAL_DOCUMENT"))
                .collect();
            let resp = self.call("batchEmbedContents", &json!({ "requests": requests }))?;
            let embeddings = resp["embeddings"]
                .as_array()
                .ok_or_else(|| self.malformed("missing 'embeddings' array"))?;
            let parsed = embeddings
                .iter()
                .map(|e| parse_vector(&e["values"]))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| self.malformed("embedding without numeric 'values'"))?;
            check_count(self.client.service(), batch.len(), &parsed)?;
            vectors.extend(parsed);
        }
        Ok(vectors)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, CollaboratorError> {
        let resp = self.call("embedContent", &self.request(text, "RETRIEVAL_QUERY"))?;
        parse_vector(&resp["embedding"]["values"])
            .ok_or_else(|| self.malformed("missing 'embedding.values'"))
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Gemini
    }
}

fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}
