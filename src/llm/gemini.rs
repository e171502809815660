//! Gemini `generateContent` client.

use std::time::Duration;

use serde_json::{Value, json};

use crate::error::CollaboratorError;
use crate::http::JsonClient;
use crate::llm::GenerativeModel;
use crate::recovery::RawModelResponse;

pub struct GeminiModel {
    client: JsonClient,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
}

impl GeminiModel {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        temperature: f64,
        timeout: Duration,
    ) -> Self {
        Self {
            client: JsonClient::new("gemini", timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.trim_start_matches("models/").to_string(),
            api_key,
            temperature,
        }
    }

    fn request_body(&self, prompt: &str, instruction: &str) -> Value {
        json!({
            "system_instruction": { "parts": [{ "text": prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": instruction }] }],
            "generationConfig": { "temperature": self.temperature },
        })
    }

    /// Concatenate the text parts of the first candidate.
    fn parse_response(&self, body: &Value) -> Result<String, CollaboratorError> {
        let malformed = |message: &str| CollaboratorError::MalformedResponse {
            service: self.client.service().into(),
            message: message.to_string(),
        };

        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| {
                let reason = body["promptFeedback"]["blockReason"]
                    .as_str()
                    .map(|r| format!("no candidates (blocked: {r})"))
                    .unwrap_or_else(|| "missing 'candidates' array in response".into());
                malformed(&reason)
            })?;

        let parts = candidate["content"]["parts"]
            .as_array()
            .ok_or_else(|| malformed("missing 'parts' array in candidate content"))?;

        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if text.is_empty() {
            return Err(malformed("candidate contains no text parts"));
        }
        Ok(text)
    }
}

impl GenerativeModel for GeminiModel {
    fn generate(
        &self,
        prompt: &str,
        instruction: &str,
    ) -> Result<RawModelResponse, CollaboratorError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        tracing::debug!(model = self.model.as_str(), url = url.as_str(), "sending Gemini request");
        let body = self.client.post(
            &url,
            &[("key", self.api_key.as_str())],
            &self.request_body(prompt, instruction),
        )?;
        Ok(RawModelResponse::Text(self.parse_response(&body)?))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> GeminiModel {
        GeminiModel::new(
            "http://127.0.0.1:1/v1beta/",
            "models/gemini-2.5-flash",
            "test-key".into(),
            0.4,
            Duration::from_secs(2),
        )
    }

    #[test]
    fn prompt_is_system_instruction_and_query_is_user_turn() {
        let body = model().request_body("Use this context", "Make cards");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "Use this context");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Make cards");
        assert_eq!(body["generationConfig"]["temperature"], 0.4);
    }

    #[test]
    fn text_parts_are_concatenated() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"Q\": " }, { "text": "\"A\"}" }] }
            }]
        });
        assert_eq!(model().parse_response(&body).unwrap(), "{\"Q\": \"A\"}");
    }

    #[test]
    fn blocked_prompt_is_malformed_response() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = model().parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_parts_are_rejected() {
        let body = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert!(model().parse_response(&body).is_err());
    }

    #[test]
    fn model_prefix_is_stripped() {
        assert_eq!(model().model_name(), "gemini-2.5-flash");
    }
}
