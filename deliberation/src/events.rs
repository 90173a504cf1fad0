//! Pipeline events and their wire form.
//!
//! Every run emits, in order:
//!
//! ```text
//! BULL_START  BULL_DONE  BEAR_START  BEAR_DONE
//! DETECTIVE_START  DETECTIVE_DONE  ORCHESTRATOR_START  ORCHESTRATOR_DONE
//! COMPLETE
//! ```
//!
//! or stops at the first failing stage with a single `ERROR`. Exactly one of
//! `COMPLETE` / `ERROR` ends a run, and it is always the last event.
//!
//! On the wire each event is a JSON object keyed by `phase`, framed as a
//! server-sent event (`data: <json>\n\n`), with `data: [DONE]\n\n` after the
//! terminal event.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::aggregate::WarRoomReport;
use crate::error::StageError;
use crate::schema::{AgentRole, StageResult};
use crate::target::Target;
use crate::thinking::ThinkingEntry;

/// Sentinel frame closing an event stream.
pub const SSE_DONE: &str = "data: [DONE]\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BullStart,
    BullDone,
    BearStart,
    BearDone,
    DetectiveStart,
    DetectiveDone,
    OrchestratorStart,
    OrchestratorDone,
    Complete,
    Error,
}

impl Phase {
    pub fn started(role: AgentRole) -> Self {
        match role {
            AgentRole::Advocate => Self::BullStart,
            AgentRole::Skeptic => Self::BearStart,
            AgentRole::Auditor => Self::DetectiveStart,
            AgentRole::Decision => Self::OrchestratorStart,
        }
    }

    pub fn done(role: AgentRole) -> Self {
        match role {
            AgentRole::Advocate => Self::BullDone,
            AgentRole::Skeptic => Self::BearDone,
            AgentRole::Auditor => Self::DetectiveDone,
            AgentRole::Decision => Self::OrchestratorDone,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BullStart => "BULL_START",
            Self::BullDone => "BULL_DONE",
            Self::BearStart => "BEAR_START",
            Self::BearDone => "BEAR_DONE",
            Self::DetectiveStart => "DETECTIVE_START",
            Self::DetectiveDone => "DETECTIVE_DONE",
            Self::OrchestratorStart => "ORCHESTRATOR_START",
            Self::OrchestratorDone => "ORCHESTRATOR_DONE",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Phase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One lifecycle record of a run. Immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted {
        stage: AgentRole,
        message: String,
    },
    StageCompleted {
        stage: AgentRole,
        data: StageResult,
        thinking: Vec<ThinkingEntry>,
    },
    Complete {
        message: String,
        result: Box<WarRoomReport>,
    },
    Failed {
        error: StageError,
    },
}

impl PipelineEvent {
    pub fn started(stage: AgentRole, target: &Target) -> Self {
        Self::StageStarted {
            stage,
            message: start_message(stage, target),
        }
    }

    pub fn completed(data: StageResult) -> Self {
        let thinking = crate::thinking::project(&data);
        Self::StageCompleted {
            stage: data.role(),
            data,
            thinking,
        }
    }

    pub fn complete(result: WarRoomReport) -> Self {
        Self::Complete {
            message: format!("War room complete for {}", result.company_name),
            result: Box::new(result),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::StageStarted { stage, .. } => Phase::started(*stage),
            Self::StageCompleted { stage, .. } => Phase::done(*stage),
            Self::Complete { .. } => Phase::Complete,
            Self::Failed { .. } => Phase::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase().is_terminal()
    }
}

fn start_message(stage: AgentRole, target: &Target) -> String {
    match stage {
        AgentRole::Advocate => format!("Bull Agent building case FOR {}...", target.name),
        AgentRole::Skeptic => "Bear Agent looking for red flags...".to_string(),
        AgentRole::Auditor => "Detective Agent auditing both arguments...".to_string(),
        AgentRole::Decision => "Orchestrator weighing the evidence...".to_string(),
    }
}

/// Flat wire shape; absent members are omitted.
#[derive(Serialize)]
struct WireEvent<'a> {
    phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a StageResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<&'a [ThinkingEntry]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a WarRoomReport>,
}

impl Serialize for PipelineEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = WireEvent {
            phase: self.phase(),
            agent: None,
            code: None,
            message: None,
            data: None,
            thinking: None,
            result: None,
        };
        match self {
            Self::StageStarted { message, .. } => wire.message = Some(message.clone()),
            Self::StageCompleted { data, thinking, .. } => {
                wire.data = Some(data);
                wire.thinking = Some(thinking.as_slice());
            }
            Self::Complete { message, result } => {
                wire.message = Some(message.clone());
                wire.result = Some(&**result);
            }
            Self::Failed { error } => {
                wire.agent = Some(error.stage().agent_name());
                wire.code = Some(error.code());
                wire.message = Some(error.to_string());
            }
        }
        wire.serialize(serializer)
    }
}

/// Frame one event as a server-sent event.
pub fn sse_frame(event: &PipelineEvent) -> Result<String, serde_json::Error> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}
