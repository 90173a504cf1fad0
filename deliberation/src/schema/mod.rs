//! Stage results and their canonical, schema-version-independent views.
//!
//! Two result shapes coexist in the wild:
//!
//! | Version     | Scores                         | Tracks                       |
//! |-------------|--------------------------------|------------------------------|
//! | `Legacy`    | flat 1–100 number              | single (customer only)       |
//! | `DualTrack` | `{customerScore, partnerScore}`| `customer*` / `partner*` keys |
//!
//! The version is detected once, at the contract boundary, and stored on the
//! [`StageResult`]. Each role module then exposes one `from_result` adapter
//! that always yields the canonical dual-track view, so aggregation and
//! rendering never branch on the version themselves.

pub mod advocate;
pub mod auditor;
pub mod decision;
pub mod fields;
pub mod skeptic;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub use advocate::{AdvocateCase, Signal};
pub use auditor::{
    AuditReport, Impact, OverlookedFinding, SplitVerdict, TrackAudit, TrackStrength, WeakClaim,
};
pub use decision::{
    DecidingFactors, DecisionMaker, DecisionReport, OutreachEmail, RegretScore, TrackDecision,
};
pub use skeptic::{CompetitorRisk, RedFlag, SkepticCase};

// ── Roles ─────────────────────────────────────────────────────────────────────

/// The four reasoning roles, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Builds the case for pursuing the target ("Bull").
    Advocate,
    /// Builds the case against pursuing the target ("Bear").
    Skeptic,
    /// Audits evidence quality on both sides ("Detective").
    Auditor,
    /// Issues the verdicts ("Orchestrator").
    Decision,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [Self::Advocate, Self::Skeptic, Self::Auditor, Self::Decision];

    /// Value the stage must echo in its `agentRole` field.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Advocate => "BULL",
            Self::Skeptic => "BEAR",
            Self::Auditor => "DETECTIVE",
            Self::Decision => "ORCHESTRATOR",
        }
    }

    /// Lowercase agent name used in events and result keys.
    pub fn agent_name(self) -> &'static str {
        match self {
            Self::Advocate => "bull",
            Self::Skeptic => "bear",
            Self::Auditor => "detective",
            Self::Decision => "orchestrator",
        }
    }

    /// The role that runs after this one, if any.
    pub fn next(self) -> Option<AgentRole> {
        match self {
            Self::Advocate => Some(Self::Skeptic),
            Self::Skeptic => Some(Self::Auditor),
            Self::Auditor => Some(Self::Decision),
            Self::Decision => None,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent_name())
    }
}

// ── Tracks ────────────────────────────────────────────────────────────────────

/// An independent evaluation dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Track {
    /// Will they buy.
    Customer,
    /// Will they co-sell or integrate.
    Partner,
}

impl Track {
    pub const BOTH: [Track; 2] = [Self::Customer, Self::Partner];

    pub fn label(self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Partner => "PARTNER",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value held once per track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTrack<T> {
    pub customer: T,
    pub partner: T,
}

impl<T> PerTrack<T> {
    pub fn new(customer: T, partner: T) -> Self {
        Self { customer, partner }
    }

    pub fn get(&self, track: Track) -> &T {
        match track {
            Track::Customer => &self.customer,
            Track::Partner => &self.partner,
        }
    }
}

/// Which track a finding bears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackTag {
    CustomerSignal,
    PartnerSignal,
    Both,
}

impl TrackTag {
    pub fn applies_to(self, track: Track) -> bool {
        match (self, track) {
            (Self::Both, _) => true,
            (Self::CustomerSignal, Track::Customer) => true,
            (Self::PartnerSignal, Track::Partner) => true,
            _ => false,
        }
    }

    /// Lenient parse: accepts `CUSTOMER_SIGNAL` as well as bare `CUSTOMER`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "CUSTOMER_SIGNAL" | "CUSTOMER" => Some(Self::CustomerSignal),
            "PARTNER_SIGNAL" | "PARTNER" => Some(Self::PartnerSignal),
            "BOTH" => Some(Self::Both),
            _ => None,
        }
    }
}

// ── Verdicts ──────────────────────────────────────────────────────────────────

/// Terminal classification of one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Strong signals, good timing, reach out now.
    Pursue,
    /// Mixed signals, revisit later.
    Hold,
    /// Red flags outweigh the opportunity.
    Avoid,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Self::Pursue, Self::Hold, Self::Avoid];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pursue => "PURSUE",
            Self::Hold => "HOLD",
            Self::Avoid => "AVOID",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PURSUE" => Ok(Self::Pursue),
            "HOLD" => Ok(Self::Hold),
            "AVOID" => Ok(Self::Avoid),
            other => Err(format!("unknown verdict {other:?}")),
        }
    }
}

// ── Scores ────────────────────────────────────────────────────────────────────

/// Advocate / skeptic score in canonical dual-track form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackScores {
    pub customer_score: Option<u8>,
    pub partner_score: Option<u8>,
    pub combined_score: Option<u8>,
}

impl TrackScores {
    /// Read either a flat legacy number or a dual-track score object.
    pub fn read(v: &Value) -> Self {
        if v.is_object() {
            Self {
                customer_score: fields::score_field(v, "customerScore"),
                partner_score: fields::score_field(v, "partnerScore"),
                combined_score: fields::score_field(v, "combinedScore"),
            }
        } else {
            let flat = fields::score(v);
            Self {
                customer_score: flat,
                partner_score: None,
                combined_score: flat,
            }
        }
    }

    pub fn for_track(&self, track: Track) -> Option<u8> {
        match track {
            Track::Customer => self.customer_score,
            Track::Partner => self.partner_score,
        }
    }
}

// ── Situational signals ───────────────────────────────────────────────────────

/// One technical-debt, fiscal-pressure or pivot observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub observation: String,
    pub source: Option<String>,
    /// What it means for the client: how the client helps (advocate) or
    /// the risk it creates (skeptic).
    pub implication: Option<String>,
    /// Pivot observations only: how well the client fits the new direction.
    pub client_fit: Option<String>,
}

/// The three situational sections both debaters may report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Situation {
    pub technical_debt: Vec<Observation>,
    pub fiscal_pressure: Vec<Observation>,
    pub recent_pivots: Vec<Observation>,
}

impl Situation {
    pub fn is_empty(&self) -> bool {
        self.technical_debt.is_empty()
            && self.fiscal_pressure.is_empty()
            && self.recent_pivots.is_empty()
    }

    /// `(heading, observations)` for each non-empty section.
    pub fn sections(&self) -> impl Iterator<Item = (&'static str, &[Observation])> {
        [
            ("Technical Debt", self.technical_debt.as_slice()),
            ("Fiscal Pressure", self.fiscal_pressure.as_slice()),
            ("Recent Pivots", self.recent_pivots.as_slice()),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
    }
}

/// Read observations from the first of `keys` holding a list; `implication`
/// comes from the first present of `implication_keys`.
pub(crate) fn read_observations(
    body: &Value,
    keys: &[&str],
    implication_keys: &[&str],
) -> Vec<Observation> {
    let Some(items) = keys
        .iter()
        .map(|k| fields::array(body, k))
        .find(|items| !items.is_empty())
    else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let observation = match item {
                Value::String(_) => fields::as_text(item)?,
                _ => fields::text_any(item, &["observation", "signal", "finding"])?,
            };
            Some(Observation {
                observation,
                source: fields::text(item, "source"),
                implication: fields::text_any(item, implication_keys),
                client_fit: fields::text(item, "clientFit"),
            })
        })
        .collect()
}

// ── Stage result ──────────────────────────────────────────────────────────────

/// Which result shape a stage emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchemaVersion {
    Legacy,
    DualTrack,
}

impl SchemaVersion {
    /// Detect the shape of a role's raw output.
    pub fn detect(role: AgentRole, body: &Value) -> Self {
        let has = |key: &str| body.get(key).is_some_and(|v| !v.is_null());
        let dual = match role {
            AgentRole::Advocate => {
                body.get("overallBullScore").is_some_and(Value::is_object)
                    || has("customerSignals")
                    || has("partnerSignals")
            }
            AgentRole::Skeptic => {
                body.get("overallBearScore").is_some_and(Value::is_object)
                    || has("customerRedFlags")
                    || has("partnerRedFlags")
                    || body.get("dealKiller").is_some_and(Value::is_object)
            }
            AgentRole::Auditor => {
                has("customerTrackAudit") || has("partnerTrackAudit") || has("splitVerdictAssessment")
            }
            AgentRole::Decision => has("customerTrack") || has("partnerTrack"),
        };
        if dual {
            Self::DualTrack
        } else {
            Self::Legacy
        }
    }
}

/// Validated output of one reasoning stage.
///
/// Only the contract boundary ([`crate::contract::parse_stage_output`])
/// constructs these, so holding one proves the body passed validation.
/// Serializes as the raw body, exactly as the backend produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    role: AgentRole,
    schema: SchemaVersion,
    body: Value,
}

impl StageResult {
    /// `body` must already be a validated JSON object.
    pub(crate) fn new(role: AgentRole, schema: SchemaVersion, body: Value) -> Self {
        Self { role, schema, body }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// The raw JSON object.
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn company_name(&self) -> String {
        fields::text(&self.body, "companyName").unwrap_or_default()
    }

    /// Pretty JSON for embedding in downstream prompts.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.body).unwrap_or_else(|_| self.body.to_string())
    }
}

impl Serialize for StageResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}
