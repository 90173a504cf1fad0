//! Runtime for the lead war room.
//!
//! Wires the deterministic core in `deliberation` to the outside world:
//!
//! - [`config`]: layered configuration (env > TOML > defaults)
//! - [`backend`]: model-serving clients behind [`backend::ReasoningBackend`]
//! - [`evidence`]: web search behind [`evidence::EvidenceProvider`]
//! - [`prompts`]: per-role system prompts and user messages
//! - [`stages`]: the role-parameterized reasoning stage
//! - [`pipeline`]: the controller that turns four stages into an event stream
//! - [`render`]: per-track dossier and summary documents
//! - [`profile`]: client-profile generation
//! - [`telemetry`]: per-run metrics

pub mod backend;
pub mod config;
pub mod evidence;
pub mod pipeline;
pub mod profile;
pub mod prompts;
pub mod render;
pub mod stages;
pub mod telemetry;

pub use backend::{BackendError, BackendSet, CompletionRequest, ReasoningBackend};
pub use config::WarRoomConfig;
pub use evidence::{EvidenceProvider, SharedEvidence, TavilyProvider};
pub use pipeline::{WarRoom, WarRoomRun};
pub use profile::{ProfileError, ProfileGenerator, ResearchProfileGenerator, StaticProfile};
pub use render::{render_all, DocumentRenderer, MarkdownRenderer, RenderError};
pub use stages::{ReasoningStage, RoleStage, StageContext, StageSet};
