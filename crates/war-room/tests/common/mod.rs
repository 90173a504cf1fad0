//! Scripted stages and recording renderers shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use deliberation::{
    parse_stage_output, AgentRole, ContractPolicy, StageError, StageResult, Track, WarRoomReport,
};
use serde_json::{json, Value};
use war_room::prompts::Upstream;
use war_room::render::{DocumentRenderer, RenderError};
use war_room::stages::{ReasoningStage, StageContext, StageSet};
use war_room::WarRoom;

/// `(role, number of upstream results visible)` per stage invocation.
pub type RunLog = Arc<Mutex<Vec<(AgentRole, usize)>>>;

/// Replies with fixed raw text, pushed through the real contract boundary.
pub struct ScriptedStage {
    role: AgentRole,
    reply: String,
    log: RunLog,
}

impl ScriptedStage {
    pub fn new(role: AgentRole, reply: impl Into<String>, log: RunLog) -> Arc<dyn ReasoningStage> {
        Arc::new(Self {
            role,
            reply: reply.into(),
            log,
        })
    }
}

#[async_trait]
impl ReasoningStage for ScriptedStage {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn run(&self, _ctx: &StageContext, upstream: Upstream<'_>) -> Result<StageResult, StageError> {
        let seen = [upstream.advocate, upstream.skeptic, upstream.auditor]
            .iter()
            .filter(|u| u.is_some())
            .count();
        self.log.lock().unwrap().push((self.role, seen));
        parse_stage_output(self.role, &self.reply, &ContractPolicy::default())
    }
}

/// Always fails with the given error.
pub struct FailingStage(pub StageError);

#[async_trait]
impl ReasoningStage for FailingStage {
    fn role(&self) -> AgentRole {
        self.0.stage()
    }

    async fn run(&self, _ctx: &StageContext, _upstream: Upstream<'_>) -> Result<StageResult, StageError> {
        Err(self.0.clone())
    }
}

/// Records every call; fails the listed `(track, dossier?)` renders.
#[derive(Default)]
pub struct RecordingRenderer {
    pub calls: Mutex<Vec<String>>,
    pub fail: Vec<(Track, bool)>,
}

impl RecordingRenderer {
    pub fn failing(fail: Vec<(Track, bool)>) -> Self {
        Self {
            fail,
            ..Self::default()
        }
    }

    fn record(&self, report: &WarRoomReport, track: Track, dossier: bool) -> Result<String, RenderError> {
        let kind = if dossier { "Dossier" } else { "Summary" };
        let name = format!("{}_{}_{kind}.md", report.company_name.replace(' ', "_"), track.label());
        self.calls.lock().unwrap().push(name.clone());
        if self.fail.contains(&(track, dossier)) {
            return Err(RenderError::Failed(format!("{name} exploded")));
        }
        Ok(name)
    }
}

#[async_trait]
impl DocumentRenderer for RecordingRenderer {
    async fn render_dossier(&self, report: &WarRoomReport, track: Track) -> Result<String, RenderError> {
        self.record(report, track, true)
    }

    async fn render_summary(&self, report: &WarRoomReport, track: Track) -> Result<String, RenderError> {
        self.record(report, track, false)
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn advocate_legacy() -> Value {
    json!({
        "agentRole": "BULL",
        "companyName": "Acme Corp",
        "overallBullScore": 80,
        "topSignals": [{"signal": "Raised $40M Series C", "strength": "HIGH", "source": "https://news.example/c"}],
        "keyArgument": "Fresh capital and a growing platform team"
    })
}

pub fn skeptic_legacy() -> Value {
    json!({
        "agentRole": "BEAR",
        "companyName": "Acme Corp",
        "overallBearScore": 20,
        "redFlags": [],
        "dealKiller": null
    })
}

pub fn auditor_legacy() -> Value {
    json!({
        "agentRole": "DETECTIVE",
        "companyName": "Acme Corp",
        "bullAudit": {"strongClaims": ["funding"], "weakClaims": [], "evidenceScore": 70},
        "bearAudit": {"strongClaims": [], "weakClaims": [], "evidenceScore": 70},
        "missingContext": []
    })
}

pub fn decision_legacy() -> Value {
    json!({
        "agentRole": "ORCHESTRATOR",
        "companyName": "Acme Corp",
        "verdict": "PURSUE",
        "confidence": 75,
        "regretScore": {"score": 70, "reason": "Budget window closes this quarter"},
        "outreachEmail": {"subject": "Your Series C platform push", "body": "Hi, congrats on the round."}
    })
}

pub fn decision_dual() -> Value {
    json!({
        "agentRole": "ORCHESTRATOR",
        "companyName": "Acme Corp",
        "regretScore": {"score": 70, "reason": "Budget window closes this quarter"},
        "customerTrack": {
            "verdict": "PURSUE",
            "confidence": 80,
            "outreachEmail": {"subject": "CI for your platform team", "body": "Hi, ..."}
        },
        "partnerTrack": {
            "verdict": "PURSUE",
            "confidence": 65,
            "outreachEmail": {"subject": "Integrating with your API", "body": "Hi, ..."}
        },
        "recommendedApproach": "CUSTOMER_NOW_PARTNER_LATER",
        "executiveSummary": "Buy now, partner after the API launch."
    })
}

pub struct Scripts {
    pub advocate: String,
    pub skeptic: String,
    pub auditor: String,
    pub decision: String,
}

impl Default for Scripts {
    fn default() -> Self {
        Self {
            advocate: advocate_legacy().to_string(),
            skeptic: skeptic_legacy().to_string(),
            auditor: auditor_legacy().to_string(),
            decision: decision_legacy().to_string(),
        }
    }
}

pub fn scripted_stages(scripts: Scripts, log: &RunLog) -> StageSet {
    StageSet {
        advocate: ScriptedStage::new(AgentRole::Advocate, scripts.advocate, log.clone()),
        skeptic: ScriptedStage::new(AgentRole::Skeptic, scripts.skeptic, log.clone()),
        auditor: ScriptedStage::new(AgentRole::Auditor, scripts.auditor, log.clone()),
        decision: ScriptedStage::new(AgentRole::Decision, scripts.decision, log.clone()),
    }
}

pub fn war_room(scripts: Scripts, renderer: Arc<dyn DocumentRenderer>) -> (WarRoom, RunLog) {
    let log = RunLog::default();
    (WarRoom::new(scripted_stages(scripts, &log), renderer), log)
}

pub const PROFILE: &str = "We sell CI tooling to mid-size engineering teams.";
