//! Deterministic core of the lead war room.
//!
//! Four reasoning stages argue about a target company: an advocate (Bull),
//! a skeptic (Bear), an auditor (Detective) and a decision maker
//! (Orchestrator). This crate holds everything about that debate that does
//! not touch the network:
//!
//! - [`target`]: domain normalization and display names
//! - [`contract`]: the parse-or-fail boundary for stage output
//! - [`schema`]: stage results and their canonical dual-track views
//! - [`approach`]: recommended-approach reconciliation table
//! - [`thinking`]: per-role trace projections for progress events
//! - [`aggregate`]: the terminal `COMPLETE` payload
//! - [`events`]: pipeline events and SSE framing
//! - [`state`]: the pipeline state machine
//! - [`artifacts`]: document naming and basename-only lookup
//!
//! The runtime (backends, evidence search, rendering, CLI) lives in the
//! `war-room` crate.

pub mod aggregate;
pub mod approach;
pub mod artifacts;
pub mod contract;
pub mod error;
pub mod events;
pub mod schema;
pub mod state;
pub mod target;
pub mod thinking;

pub use aggregate::{assemble, DocumentSet, StageOutputs, TrackDocuments, TrackSummary, WarRoomReport};
pub use approach::{ApproachSource, RecommendedApproach};
pub use contract::{parse_stage_output, ContractPolicy};
pub use error::{FailureKind, InputValidationError, StageError};
pub use events::{sse_frame, Phase, PipelineEvent, SSE_DONE};
pub use schema::{AgentRole, SchemaVersion, StageResult, Track, Verdict};
pub use state::{PipelineState, PipelineStateMachine};
pub use target::Target;
