//! Blocking JSON-over-HTTP helper shared by the Gemini and Ollama clients.

use std::time::Duration;

use serde_json::Value;

use crate::error::CollaboratorError;

/// Response bodies quoted in errors are cut to this many characters.
const BODY_EXCERPT_CHARS: usize = 500;

/// A `ureq` agent bound to one remote service name.
#[derive(Clone)]
pub(crate) struct JsonClient {
    agent: ureq::Agent,
    service: &'static str,
}

impl JsonClient {
    pub(crate) fn new(service: &'static str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent, service }
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    /// POST `body` to `url` and parse the JSON reply.
    ///
    /// `query` pairs are appended by ureq, so secrets passed there never
    /// appear in `url` and therefore never in logs or errors.
    pub(crate) fn post(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, CollaboratorError> {
        let body_str = serde_json::to_string(body).map_err(|e| CollaboratorError::RequestFailed {
            service: self.service.into(),
            message: format!("JSON serialize error: {e}"),
        })?;

        let mut request = self
            .agent
            .post(url)
            .set("Content-Type", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        let resp = request
            .send_string(&body_str)
            .map_err(|e| self.map_error(url, e))?;

        let resp_str = resp
            .into_string()
            .map_err(|e| CollaboratorError::RequestFailed {
                service: self.service.into(),
                message: format!("failed to read response body: {e}"),
            })?;

        serde_json::from_str(&resp_str).map_err(|e| CollaboratorError::MalformedResponse {
            service: self.service.into(),
            message: format!("invalid JSON in response: {e}"),
        })
    }

    fn map_error(&self, url: &str, err: ureq::Error) -> CollaboratorError {
        match err {
            ureq::Error::Status(status, resp) => CollaboratorError::Status {
                service: self.service.into(),
                status,
                body: excerpt(&resp.into_string().unwrap_or_default()),
            },
            ureq::Error::Transport(transport) => match transport.kind() {
                ureq::ErrorKind::ConnectionFailed | ureq::ErrorKind::Dns => {
                    CollaboratorError::Unavailable {
                        service: self.service.into(),
                        url: url.to_string(),
                    }
                }
                _ => CollaboratorError::RequestFailed {
                    service: self.service.into(),
                    message: transport.to_string(),
                },
            },
        }
    }
}

impl std::fmt::Debug for JsonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonClient")
            .field("service", &self.service)
            .finish()
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_unavailable() {
        let client = JsonClient::new("ollama", Duration::from_secs(2));
        let err = client
            .post("http://127.0.0.1:1/api/generate", &[], &serde_json::json!({}))
            .unwrap_err();
        assert!(
            matches!(err, CollaboratorError::Unavailable { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(BODY_EXCERPT_CHARS + 10);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), BODY_EXCERPT_CHARS + 1);
        assert!(cut.ends_with('…'));
        assert_eq!(excerpt("  short  "), "short");
    }
}
