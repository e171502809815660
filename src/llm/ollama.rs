//! Ollama `/api/generate` client.

use std::time::Duration;

use serde_json::{Value, json};

use crate::error::CollaboratorError;
use crate::http::JsonClient;
use crate::llm::GenerativeModel;
use crate::recovery::RawModelResponse;

pub struct OllamaModel {
    client: JsonClient,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaModel {
    pub fn new(base_url: &str, model: &str, temperature: f64, timeout: Duration) -> Self {
        Self {
            client: JsonClient::new("ollama", timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
        }
    }

    fn request_body(&self, prompt: &str, instruction: &str) -> Value {
        json!({
            "model": self.model,
            "system": prompt,
            "prompt": instruction,
            "stream": false,
            "options": { "temperature": self.temperature },
        })
    }
}

impl GenerativeModel for OllamaModel {
    fn generate(
        &self,
        prompt: &str,
        instruction: &str,
    ) -> Result<RawModelResponse, CollaboratorError> {
        let url = format!("{}/api/generate", self.base_url);
        let json = self
            .client
            .post(&url, &[], &self.request_body(prompt, instruction))?;

        json["response"]
            .as_str()
            .map(|s| RawModelResponse::Text(s.to_string()))
            .ok_or_else(|| CollaboratorError::MalformedResponse {
                service: self.client.service().into(),
                message: "missing 'response' field".into(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
