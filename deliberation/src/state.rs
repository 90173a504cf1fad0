//! Pipeline state machine: explicit states and legal transitions.
//!
//! ```text
//!  Init ─► Advocate ─► Skeptic ─► Auditor ─► Decision ─► Render ─► Complete
//!            │           │          │           │
//!            └───────────┴──────────┴───────────┴──────────────► Failed
//! ```
//!
//! Transitions are strictly forward. `Complete` and `Failed` are absorbing.
//! The controller drives the machine and records every transition so a run
//! can be summarized after the fact.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::schema::AgentRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineState {
    Init,
    Advocate,
    Skeptic,
    Auditor,
    Decision,
    Render,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// State in which `role` runs.
    pub fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::Advocate => Self::Advocate,
            AgentRole::Skeptic => Self::Skeptic,
            AgentRole::Auditor => Self::Auditor,
            AgentRole::Decision => Self::Decision,
        }
    }

    /// The only forward successor, if any.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Advocate),
            Self::Advocate => Some(Self::Skeptic),
            Self::Skeptic => Some(Self::Auditor),
            Self::Auditor => Some(Self::Decision),
            Self::Decision => Some(Self::Render),
            Self::Render => Some(Self::Complete),
            Self::Complete | Self::Failed => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Advocate => write!(f, "ADVOCATE"),
            Self::Skeptic => write!(f, "SKEPTIC"),
            Self::Auditor => write!(f, "AUDITOR"),
            Self::Decision => write!(f, "DECISION"),
            Self::Render => write!(f, "RENDER"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Check whether a transition is legal.
///
/// Failure is reachable from every stage state. Rendering never fails the
/// run, so `Render → Failed` is not legal.
pub fn is_legal_transition(from: PipelineState, to: PipelineState) -> bool {
    use PipelineState::*;
    if from.successor() == Some(to) {
        return true;
    }
    matches!((from, to), (Advocate | Skeptic | Auditor | Decision, Failed))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelineState,
    pub to: PipelineState,
    /// Milliseconds since the machine was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal pipeline transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Tracks the current state of one run and logs every transition.
#[derive(Debug)]
pub struct PipelineStateMachine {
    current: PipelineState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl Default for PipelineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStateMachine {
    pub fn new() -> Self {
        Self {
            current: PipelineState::Init,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelineState {
        self.current
    }

    pub fn advance(
        &mut self,
        to: PipelineState,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }
        tracing::debug!(from = %self.current, to = %to, "pipeline transition");
        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    pub fn fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        self.advance(PipelineState::Failed, Some(reason))
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// `INIT → ADVOCATE → ... → COMPLETE (12ms)`
    pub fn summary(&self) -> String {
        let mut path = vec![PipelineState::Init.to_string()];
        path.extend(self.transitions.iter().map(|t| t.to.to_string()));
        format!(
            "{} ({}ms)",
            path.join(" → "),
            self.created_at.elapsed().as_millis()
        )
    }
}
