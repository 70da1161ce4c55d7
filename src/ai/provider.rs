// SPDX-License-Identifier: BUSL-1.1

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::types::{AiConfig, AiError, Sampling};
use crate::observability::Sensitive;

// ─── Trait ───────────────────────────────────────────────────

#[async_trait]
pub trait AIProvider: Send + Sync {
    fn provider_id(&self) -> &'static str;

    /// Single-shot completion; returns the assistant message text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        sampling: Sampling,
    ) -> Result<String, AiError>;
}

// ─── OpenAI-compatible chat completions (DeepSeek) ──────────

pub struct ChatCompletionsProvider {
    client: Client,
    api_key: Sensitive<String>,
    endpoint: String,
    model: String,
}

impl ChatCompletionsProvider {
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_blank())
            .ok_or(AiError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(config.effective_timeout())
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.effective_base_url()),
            model: config.effective_model(),
        })
    }
}

#[async_trait]
impl AIProvider for ChatCompletionsProvider {
    fn provider_id(&self) -> &'static str {
        "deepseek"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        sampling: Sampling,
    ) -> Result<String, AiError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
        });

        debug!(
            "Completion request: model={}, max_tokens={}",
            self.model, sampling.max_tokens
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AiError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }

        extract_message_content(&text)
    }
}

// ─── Helpers ─────────────────────────────────────────────────

/// Maps a non-2xx reply onto the gateway error taxonomy.
pub(crate) fn status_error(status: u16, body: &str) -> AiError {
    match status {
        401 => AiError::InvalidApiKey,
        402 => AiError::InsufficientBalance,
        _ => AiError::Api {
            status,
            message: extract_api_error(body).unwrap_or_else(|| "Unknown error".to_string()),
        },
    }
}

/// Extract a user-friendly error message from an API error response body
fn extract_api_error(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    // { "error": { "message": "..." } }
    parsed["error"]["message"].as_str().map(|s| s.to_string())
}

fn extract_message_content(body: &str) -> Result<String, AiError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| AiError::MalformedResponse(e.to_string()))?;
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AiError::MalformedResponse("missing choices[0].message.content".into()))
}

/// Extract a fenced code block from LLM response text
pub fn extract_query_from_response(response: &str) -> Option<String> {
    let fences = ["```sql", "```mysql", "```json", "```"];

    for fence in &fences {
        if let Some(start_idx) = response.find(fence) {
            let content_start = start_idx + fence.len();
            // Skip to the next line after the opening fence
            let content_start = response[content_start..]
                .find('\n')
                .map(|i| content_start + i + 1)
                .unwrap_or(content_start);

            if let Some(end_idx) = response[content_start..].find("```") {
                let query = response[content_start..content_start + end_idx].trim();
                if !query.is_empty() {
                    return Some(query.to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_query_sql_block() {
        let response = "Here's your query:\n\n```sql\nSELECT * FROM users WHERE id = 1;\n```\n\nThis selects...";
        assert_eq!(
            extract_query_from_response(response),
            Some("SELECT * FROM users WHERE id = 1;".to_string())
        );
    }

    #[test]
    fn test_extract_query_json_block() {
        let response = "```json\n{\"isValid\": true}\n```";
        assert_eq!(
            extract_query_from_response(response),
            Some("{\"isValid\": true}".to_string())
        );
    }

    #[test]
    fn test_extract_query_no_block() {
        assert_eq!(extract_query_from_response("SELECT 1"), None);
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(status_error(401, ""), AiError::InvalidApiKey));
        assert!(matches!(status_error(402, ""), AiError::InsufficientBalance));

        let body = r#"{"error":{"message":"Model not found","type":"invalid_request_error"}}"#;
        match status_error(404, body) {
            AiError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Model not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        match status_error(500, "<html>oops</html>") {
            AiError::Api { message, .. } => assert_eq!(message, "Unknown error"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_message_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  SELECT 1;\n"}}]}"#;
        assert_eq!(extract_message_content(body).unwrap(), "SELECT 1;");
        assert!(matches!(
            extract_message_content(r#"{"choices":[]}"#),
            Err(AiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_missing_key_is_rejected_up_front() {
        let config = AiConfig {
            api_key: None,
            base_url: None,
            model: None,
            timeout_secs: None,
        };
        assert!(matches!(
            ChatCompletionsProvider::from_config(&config),
            Err(AiError::MissingApiKey)
        ));
    }
}
