//! Error taxonomy for the war-room pipeline.
//!
//! | Error                   | Raised by             | Effect on a run                   |
//! |-------------------------|-----------------------|-----------------------------------|
//! | `InputValidationError`  | target / profile      | rejected before any event         |
//! | `StageError::MalformedOutput`    | contract boundary | one `ERROR` event, run halts |
//! | `StageError::BackendUnavailable` | model / search call | one `ERROR` event, run halts |
//!
//! Backend failures carry a [`FailureKind`] so that an optional transparent
//! retry can be applied below the stage boundary without string matching.

use std::fmt;

use thiserror::Error;

use crate::schema::AgentRole;

/// Caller-facing rejection of run inputs. Never produces a pipeline event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputValidationError {
    #[error("domain is empty")]
    EmptyDomain,

    #[error("domain is not valid: {0:?}")]
    InvalidDomain(String),

    #[error("client profile is empty")]
    EmptyProfile,
}

/// Classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS, TLS, reset.
    Network,
    /// Request exceeded the client timeout.
    Timeout,
    /// Credentials missing or rejected (401/403).
    Auth,
    /// Provider quota or rate limit (429).
    RateLimit,
    /// Provider-side failure (5xx).
    Server,
    /// Any other non-success response.
    Rejected,
}

impl FailureKind {
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimit | Self::Server
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Auth => write!(f, "auth"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Terminal failure of a reasoning stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// The backend answered, but not with a single well-formed JSON object
    /// honoring the stage's contract.
    #[error("{stage} returned malformed output: {reason}")]
    MalformedOutput { stage: AgentRole, reason: String },

    /// The model-serving or evidence call itself failed.
    #[error("{stage} backend unavailable ({kind}): {reason}")]
    BackendUnavailable {
        stage: AgentRole,
        kind: FailureKind,
        reason: String,
    },
}

impl StageError {
    pub fn malformed(stage: AgentRole, reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            stage,
            reason: reason.into(),
        }
    }

    pub fn unavailable(stage: AgentRole, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            stage,
            kind,
            reason: reason.into(),
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> AgentRole {
        match self {
            Self::MalformedOutput { stage, .. } | Self::BackendUnavailable { stage, .. } => *stage,
        }
    }

    /// Machine-readable code used in `ERROR` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedOutput { .. } => "MALFORMED_OUTPUT",
            Self::BackendUnavailable { .. } => "BACKEND_UNAVAILABLE",
        }
    }

    /// Whether a transparent retry below the stage boundary may help.
    ///
    /// Malformed output is never retried: the contract forbids recovery.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::MalformedOutput { .. } => false,
            Self::BackendUnavailable { kind, .. } => kind.is_retriable(),
        }
    }
}
