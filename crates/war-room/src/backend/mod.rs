//! Model-serving backends.
//!
//! One [`ReasoningBackend`] per provider, each owning its own
//! `reqwest::Client`. Stages receive them through `Arc`; there are no
//! process-wide clients.
//!
//! ## Failure classification
//!
//! | Condition                 | `FailureKind` | Retriable |
//! |---------------------------|---------------|-----------|
//! | connect / DNS / TLS error | `Network`     | yes       |
//! | client timeout            | `Timeout`     | yes       |
//! | HTTP 401 / 403            | `Auth`        | no        |
//! | HTTP 429                  | `RateLimit`   | yes       |
//! | HTTP 5xx                  | `Server`      | yes       |
//! | any other non-2xx / body  | `Rejected`    | no        |

pub mod anthropic;
pub mod openai;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use deliberation::FailureKind;
use thiserror::Error;

use crate::config::{Provider, RoleConfig, WarRoomConfig};

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiCompatBackend;

/// Longest provider error body kept in a [`BackendError`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// One system + user exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn for_role(role: &RoleConfig, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: role.model.clone(),
            system: system.into(),
            user: user.into(),
            temperature: role.temperature,
            max_tokens: role.max_tokens,
            json_mode: role.json_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} failure: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => FailureKind::Auth,
            429 => FailureKind::RateLimit,
            500..=599 => FailureKind::Server,
            _ => FailureKind::Rejected,
        };
        let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        Self::new(kind, format!("HTTP {status}: {body}"))
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else {
            FailureKind::Network
        };
        Self::new(kind, err.to_string())
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

/// Produces raw text for a prompt. Parsing is the caller's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, BackendError>;
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("building HTTP client")
}

/// Backends keyed by provider, built once per process.
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: HashMap<Provider, Arc<dyn ReasoningBackend>>,
}

impl BackendSet {
    /// Build a backend for every provider the configured roles use.
    ///
    /// # Errors
    ///
    /// Fails when a used provider has no API key in the environment.
    pub fn from_config(config: &WarRoomConfig) -> Result<Self> {
        let mut set = Self::default();
        for provider in config.roles.providers() {
            let key = config.keys.provider(provider).with_context(|| {
                format!(
                    "{} is not set (required by provider {provider})",
                    provider.api_key_env()
                )
            })?;
            let client = http_client(config.providers.request_timeout_secs)?;
            let base_url = config.providers.base_url(provider).to_string();
            let backend: Arc<dyn ReasoningBackend> = match provider {
                Provider::Anthropic => Arc::new(AnthropicBackend::new(client, base_url, key)),
                Provider::Groq | Provider::Mistral | Provider::OpenAi => {
                    Arc::new(OpenAiCompatBackend::new(client, base_url, key))
                }
            };
            set.insert(provider, backend);
        }
        Ok(set)
    }

    pub fn insert(&mut self, provider: Provider, backend: Arc<dyn ReasoningBackend>) {
        self.backends.insert(provider, backend);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ReasoningBackend>> {
        self.backends.get(&provider).cloned()
    }
}
