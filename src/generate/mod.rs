use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::BackendConfig;
use crate::StudyError;

/// Capability that turns a composed prompt into generated text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, StudyError>;
}

/// Chat-completions client for an OpenRouter-style backend.
pub struct OpenRouterClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl OpenRouterClient {
    pub fn new(config: &BackendConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.request_timeout_secs,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, StudyError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
        });

        tracing::debug!("Sending generation request to {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StudyError::BackendTimeout(self.timeout_secs)
                } else {
                    StudyError::BackendHttp(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StudyError::BackendHttp(format!(
                "HTTP {} from {}",
                status, self.endpoint
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| StudyError::BackendFormat(format!("non-JSON response body: {}", e)))?;

        parse_completion(&payload)
    }
}

/// Interpret a chat-completions response body.
///
/// Three shapes are accepted: a `choices` list (success), an `error` object
/// in a 2xx body (application failure), and anything else (format failure).
pub fn parse_completion(payload: &Value) -> Result<String, StudyError> {
    if let Some(choices) = payload.get("choices").and_then(Value::as_array) {
        return choices
            .first()
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(|content| content.to_string())
            .ok_or_else(|| {
                StudyError::BackendFormat("choices list without message content".to_string())
            });
    }

    if let Some(error) = payload.get("error") {
        let message = error["message"].as_str().unwrap_or("unknown backend error");
        return Err(StudyError::BackendApplication(message.to_string()));
    }

    Err(StudyError::BackendFormat(
        "unexpected response format".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choices_yields_first_message_content() {
        let payload = serde_json::json!({
            "choices": [{"message": {"content": "X"}}]
        });
        assert_eq!(parse_completion(&payload).unwrap(), "X");
    }

    #[test]
    fn test_parse_takes_first_of_many_choices() {
        let payload = serde_json::json!({
            "choices": [
                {"message": {"content": "first"}},
                {"message": {"content": "second"}},
            ]
        });
        assert_eq!(parse_completion(&payload).unwrap(), "first");
    }

    #[test]
    fn test_parse_error_object_is_application_error() {
        let payload = serde_json::json!({"error": {"message": "Y"}});
        match parse_completion(&payload) {
            Err(StudyError::BackendApplication(message)) => assert!(message.contains('Y')),
            other => panic!("expected BackendApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_object_is_format_error() {
        let payload = serde_json::json!({});
        match parse_completion(&payload) {
            Err(StudyError::BackendFormat(message)) => {
                assert!(message.contains("unexpected response format"))
            }
            other => panic!("expected BackendFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_choices_is_format_error() {
        let payload = serde_json::json!({"choices": []});
        assert!(matches!(
            parse_completion(&payload),
            Err(StudyError::BackendFormat(_))
        ));
    }

    #[test]
    fn test_parse_error_without_message_still_errors() {
        let payload = serde_json::json!({"error": {}});
        assert!(matches!(
            parse_completion(&payload),
            Err(StudyError::BackendApplication(_))
        ));
    }
}
