//! Assembly of the terminal `COMPLETE` payload.
//!
//! [`assemble`] is a pure function of the target and the four stage results.
//! Both tracks are always present in the output; anything unknown surfaces
//! as an explicit `null`, never as a missing key.

use serde::Serialize;

use crate::approach::{self, ApproachSource, ApproachViolation, RecommendedApproach};
use crate::schema::{
    AuditReport, DecisionMaker, DecisionReport, OutreachEmail, PerTrack,
    RegretScore, SchemaVersion, SkepticCase, StageResult, Track, TrackStrength, Verdict,
};
use crate::target::Target;

/// The four validated stage results of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutputs {
    pub advocate: StageResult,
    pub skeptic: StageResult,
    pub auditor: StageResult,
    pub decision: StageResult,
}

/// Raw stage results keyed by agent name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentOutputs {
    pub bull: StageResult,
    pub bear: StageResult,
    pub detective: StageResult,
    pub orchestrator: StageResult,
}

/// Everything the report knows about one track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub verdict: Option<Verdict>,
    pub confidence: Option<u8>,
    pub regret_score: Option<RegretScore>,
    pub target_decision_maker: Option<DecisionMaker>,
    pub outreach_email: Option<OutreachEmail>,
    /// Only set when the verdict is `HOLD`.
    pub if_hold: Option<String>,
    /// Only set when the verdict is `AVOID`.
    pub if_avoid: Option<String>,
    pub deal_killer: Option<String>,
    pub evidence_score: Option<u8>,
    pub strength: Option<TrackStrength>,
}

/// Filenames of one track's rendered documents; `None` when rendering failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackDocuments {
    pub dossier: Option<String>,
    pub summary: Option<String>,
}

pub type DocumentSet = PerTrack<TrackDocuments>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarRoomReport {
    pub company_name: String,
    pub domain: String,
    pub schema_version: SchemaVersion,
    pub recommended_approach: RecommendedApproach,
    pub recommended_approach_reason: Option<String>,
    pub approach_source: ApproachSource,
    pub approach_violation: Option<ApproachViolation>,
    pub executive_summary: Option<String>,
    pub customer_track: TrackSummary,
    pub partner_track: TrackSummary,
    pub client_advantages: Vec<String>,
    pub client_disadvantages: Vec<String>,
    pub next_steps: Vec<String>,

    // Customer-track mirrors for single-track consumers.
    pub verdict: Option<Verdict>,
    pub confidence: Option<u8>,
    pub regret_score: Option<RegretScore>,
    pub outreach_email: Option<OutreachEmail>,

    pub documents: DocumentSet,
    pub agent_outputs: AgentOutputs,
}

impl WarRoomReport {
    pub fn track(&self, track: Track) -> &TrackSummary {
        match track {
            Track::Customer => &self.customer_track,
            Track::Partner => &self.partner_track,
        }
    }

    pub fn attach_documents(&mut self, documents: DocumentSet) {
        self.documents = documents;
    }
}

/// Build the report for a successful run. Never fails.
pub fn assemble(target: &Target, outputs: StageOutputs) -> WarRoomReport {
    let skeptic = SkepticCase::from_result(&outputs.skeptic);
    let audit = AuditReport::from_result(&outputs.auditor);
    let decision = DecisionReport::from_result(&outputs.decision);

    let summaries = PerTrack::new(
        summarize(Track::Customer, &decision, &skeptic, &audit),
        summarize(Track::Partner, &decision, &skeptic, &audit),
    );

    let advice = audit
        .split_verdict
        .as_ref()
        .and_then(|s| s.recommended_approach.as_deref());
    let reconciled = approach::reconcile(
        summaries.customer.verdict,
        summaries.partner.verdict,
        decision.recommended_approach.as_deref(),
        advice,
    );

    let reason = match reconciled.source {
        ApproachSource::Proposed => decision.recommended_approach_reason.clone(),
        ApproachSource::AuditorAdvice => audit
            .split_verdict
            .as_ref()
            .and_then(|s| s.reasoning.clone()),
        ApproachSource::Derived | ApproachSource::LegacyFallback => None,
    }
    .or_else(|| Some(derived_reason(&summaries, reconciled.source)));

    let PerTrack {
        customer: customer_track,
        partner: partner_track,
    } = summaries;

    WarRoomReport {
        company_name: target.name.clone(),
        domain: target.domain.clone(),
        schema_version: outputs.decision.schema(),
        recommended_approach: reconciled.approach,
        recommended_approach_reason: reason,
        approach_source: reconciled.source,
        approach_violation: reconciled.violation,
        executive_summary: decision.executive_summary.clone(),
        verdict: customer_track.verdict,
        confidence: customer_track.confidence,
        regret_score: customer_track.regret_score.clone(),
        outreach_email: customer_track.outreach_email.clone(),
        customer_track,
        partner_track,
        client_advantages: decision.client_advantages,
        client_disadvantages: decision.client_disadvantages,
        next_steps: decision.next_steps,
        documents: DocumentSet::default(),
        agent_outputs: AgentOutputs {
            bull: outputs.advocate,
            bear: outputs.skeptic,
            detective: outputs.auditor,
            orchestrator: outputs.decision,
        },
    }
}

fn summarize(
    track: Track,
    decision: &DecisionReport,
    skeptic: &SkepticCase,
    audit: &AuditReport,
) -> TrackSummary {
    let mut summary = TrackSummary {
        deal_killer: skeptic.deal_killer.get(track).clone(),
        evidence_score: audit.evidence_score(track),
        strength: audit.strength(track),
        ..TrackSummary::default()
    };
    let Some(d) = decision.track(track) else {
        return summary;
    };

    summary.verdict = d.verdict;
    summary.confidence = d.confidence;
    summary.regret_score = d.regret_score.clone();
    summary.target_decision_maker = d.target_decision_maker.clone();
    summary.outreach_email = d.outreach_email.clone();
    summary.if_hold = d.if_hold.clone().filter(|_| d.verdict == Some(Verdict::Hold));
    summary.if_avoid = d.if_avoid.clone().filter(|_| d.verdict == Some(Verdict::Avoid));
    summary
}

fn derived_reason(summaries: &PerTrack<TrackSummary>, source: ApproachSource) -> String {
    let show = |v: Option<Verdict>| v.map(|v| v.as_str()).unwrap_or("none");
    let customer = show(summaries.customer.verdict);
    let partner = show(summaries.partner.verdict);
    match source {
        ApproachSource::LegacyFallback => {
            format!("Single-track decision (customer {customer}, partner {partner})")
        }
        _ => format!("Derived from customer {customer} and partner {partner} verdicts"),
    }
}
