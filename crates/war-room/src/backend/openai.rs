//! OpenAI-compatible chat completions (Groq, Mistral, OpenAI).

use async_trait::async_trait;
use deliberation::FailureKind;
use serde_json::{json, Value};
use tracing::debug;

use super::{BackendError, CompletionRequest, ReasoningBackend};

pub struct OpenAiCompatBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiCompatBackend {
    /// `base_url` includes the version segment, e.g. `https://api.groq.com/openai/v1`.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

pub(crate) fn request_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": [
            {"role": "system", "content": request.system},
            {"role": "user", "content": request.user}
        ],
        "temperature": request.temperature,
        "max_tokens": request.max_tokens
    });
    if request.json_mode {
        body["response_format"] = json!({"type": "json_object"});
    }
    body
}

pub(crate) fn extract_content(resp: &Value) -> Result<String, BackendError> {
    resp["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| BackendError::new(FailureKind::Rejected, "response has no message content"))
}

#[async_trait]
impl ReasoningBackend for OpenAiCompatBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError> {
        debug!(model = %request.model, url = %self.endpoint(), "chat completion request");
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
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
        extract_content(&resp_json)
    }
}
