//! Generative model clients.
//!
//! A [`GenerativeModel`] takes the rendered prompt (sent as the system
//! instruction) and the fixed user instruction, and answers with a
//! [`RawModelResponse`] for the recovery parser. No streaming, no retries.

pub mod gemini;
pub mod ollama;

use std::time::Duration;

use crate::config::{Config, GOOGLE_API_KEY_VAR, LlmProvider};
use crate::error::CollaboratorError;
use crate::recovery::RawModelResponse;

pub use gemini::GeminiModel;
pub use ollama::OllamaModel;

/// A text-generation backend.
pub trait GenerativeModel: Send + Sync {
    /// Generate a response for `instruction` under the system `prompt`.
    fn generate(&self, prompt: &str, instruction: &str)
    -> Result<RawModelResponse, CollaboratorError>;

    /// Model identifier for logging.
    fn model_name(&self) -> &str;
}

/// Build the model selected by `config.llm.provider`.
pub fn model_for(config: &Config) -> Result<Box<dyn GenerativeModel>, CollaboratorError> {
    let llm = &config.llm;
    let timeout = Duration::from_secs(llm.timeout_secs);
    match llm.provider {
        LlmProvider::Gemini => {
            let api_key = config.credentials.google_api_key.clone().ok_or_else(|| {
                CollaboratorError::MissingCredentials {
                    service: "gemini".into(),
                    variable: GOOGLE_API_KEY_VAR.into(),
                }
            })?;
            Ok(Box::new(GeminiModel::new(
                llm.effective_base_url(),
                llm.effective_model(),
                api_key,
                llm.temperature,
                timeout,
            )))
        }
        LlmProvider::Ollama => Ok(Box::new(OllamaModel::new(
            llm.effective_base_url(),
            llm.effective_model(),
            llm.temperature,
            timeout,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_requires_api_key() {
        let err = model_for(&Config::default()).err().unwrap();
        assert!(matches!(err, CollaboratorError::MissingCredentials { .. }));
    }

    #[test]
    fn providers_pick_their_default_models() {
        let mut config = Config::default();
        config.credentials.google_api_key = Some("k".into());
        assert_eq!(model_for(&config).unwrap().model_name(), "gemini-2.5-flash");

        config.llm.provider = LlmProvider::Ollama;
        assert_eq!(model_for(&config).unwrap().model_name(), "llama3.2");
    }
}
