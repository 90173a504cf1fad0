//! Anthropic messages API.

use async_trait::async_trait;
use deliberation::FailureKind;
use serde_json::{json, Value};
use tracing::debug;

use super::{BackendError, CompletionRequest, ReasoningBackend};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

pub(crate) fn request_body(request: &CompletionRequest) -> Value {
    json!({
        "model": request.model,
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
        "system": request.system,
        "messages": [{"role": "user", "content": request.user}]
    })
}

/// Join every text block; tool-use and other blocks are skipped.
pub(crate) fn extract_text(resp: &Value) -> Result<String, BackendError> {
    let blocks = resp["content"].as_array().ok_or_else(|| {
        BackendError::new(FailureKind::Rejected, "response has no content blocks")
    })?;
    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    if text.is_empty() {
        return Err(BackendError::new(
            FailureKind::Rejected,
            "response has no text blocks",
        ));
    }
    Ok(text.join(" "))
}

#[async_trait]
impl ReasoningBackend for AnthropicBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %request.model, url = %url, "messages request");
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body(request))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(&e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status, &body));
        }

        let resp_json: Value = response.json().await.map_err(|e| {
            BackendError::new(FailureKind::Rejected, format!("unreadable response body: {e}"))
        })?;
        extract_text(&resp_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_is_top_level() {
        let body = request_body(&CompletionRequest {
            model: "claude-sonnet-4-6".into(),
            system: "You are the Bull Agent.".into(),
            user: "Research acme.com".into(),
            temperature: 0.4,
            max_tokens: 2000,
            json_mode: false,
        });
        assert_eq!(body["system"], "You are the Bull Agent.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn text_blocks_are_joined() {
        let resp = json!({"content": [
            {"type": "text", "text": "{\"agentRole\":"},
            {"type": "server_tool_use", "name": "web_search"},
            {"type": "text", "text": "\"BULL\"}"}
        ]});
        assert_eq!(extract_text(&resp).unwrap(), "{\"agentRole\": \"BULL\"}");
    }

    #[test]
    fn no_text_is_rejected() {
        let err = extract_text(&json!({"content": [{"type": "tool_use"}]})).unwrap_err();
        assert_eq!(err.kind, FailureKind::Rejected);
        assert!(extract_text(&json!({})).is_err());
    }
}
