//! Embedding backends.
//!
//! An [`Embedder`] turns chunk texts and the retrieval query into vectors.
//! Which backend runs is an [`EmbeddingBackend`] identifier from the config;
//! [`embedder_for`] builds the matching implementation.

pub mod gemini;
pub mod hashing;
pub mod ollama;

use std::time::Duration;

use serde_json::Value;

use crate::config::{Config, EmbeddingBackend, GOOGLE_API_KEY_VAR};
use crate::error::CollaboratorError;

pub use gemini::GeminiEmbedder;
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

/// Computes embeddings for documents and queries.
pub trait Embedder: Send + Sync {
    /// Embed chunk texts; one vector per input, in input order.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollaboratorError>;

    /// Embed a retrieval query.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, CollaboratorError>;

    /// Which backend produced the vectors.
    fn backend(&self) -> EmbeddingBackend;
}

/// Build the embedder selected by `config.embedding.backend`.
pub fn embedder_for(config: &Config) -> Result<Box<dyn Embedder>, CollaboratorError> {
    let embedding = &config.embedding;
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    match embedding.backend {
        EmbeddingBackend::Gemini => {
            let api_key = config.credentials.google_api_key.clone().ok_or_else(|| {
                CollaboratorError::MissingCredentials {
                    service: "gemini embeddings".into(),
                    variable: GOOGLE_API_KEY_VAR.into(),
                }
            })?;
            Ok(Box::new(GeminiEmbedder::new(
                embedding.effective_base_url(),
                embedding.effective_model(),
                api_key,
                embedding.batch_size,
                timeout,
            )))
        }
        EmbeddingBackend::Ollama => Ok(Box::new(OllamaEmbedder::new(
            embedding.effective_base_url(),
            embedding.effective_model(),
            embedding.batch_size,
            timeout,
        ))),
        EmbeddingBackend::Hashing => Ok(Box::new(HashingEmbedder::new(embedding.dimension))),
    }
}

/// Read a JSON array of numbers as an `f32` vector.
pub(crate) fn parse_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Check that a backend answered with one vector per input.
pub(crate) fn check_count(
    service: &str,
    expected: usize,
    vectors: &[Vec<f32>],
) -> Result<(), CollaboratorError> {
    if vectors.len() != expected {
        return Err(CollaboratorError::CountMismatch {
            service: service.to_string(),
            expected,
            actual: vectors.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_without_key_is_missing_credentials() {
        let config = Config::default();
        let err = embedder_for(&config).err().unwrap();
        match err {
            CollaboratorError::MissingCredentials { variable, .. } => {
                assert_eq!(variable, "GOOGLE_API_KEY")
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn hashing_backend_needs_no_credentials() {
        let mut config = Config::default();
        config.embedding.backend = EmbeddingBackend::Hashing;
        let embedder = embedder_for(&config).unwrap();
        assert_eq!(embedder.backend(), EmbeddingBackend::Hashing);
        assert_eq!(embedder.embed_query("cell").unwrap().len(), 384);
    }

    #[test]
    fn parse_vector_rejects_non_numbers() {
        assert_eq!(
            parse_vector(&serde_json::json!([0.5, -1, 2.0])),
            Some(vec![0.5, -1.0, 2.0])
        );
        assert_eq!(parse_vector(&serde_json::json!([0.5, "x"])), None);
        assert_eq!(parse_vector(&serde_json::json!({"values": []})), None);
    }

    #[test]
    fn count_mismatch_is_reported() {
        let err = check_count("ollama", 3, &[vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            CollaboratorError::CountMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
    }
}
