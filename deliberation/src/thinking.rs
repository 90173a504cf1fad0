//! Human-scannable "thinking" traces attached to `*_DONE` events.
//!
//! Each role has one pure projection from its canonical view to an ordered
//! list of [`ThinkingEntry`] values. Projections never fail: a missing
//! optional field simply yields fewer entries.

use serde::{Deserialize, Serialize};

use crate::schema::{
    AdvocateCase, AgentRole, AuditReport, DecisionReport, SkepticCase, StageResult, Track,
};

/// Per-list cap so a trace stays short.
const MAX_PER_LIST: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingEntry {
    pub fact: String,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ThinkingEntry {
    fn new(fact: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            fact: fact.into(),
            reasoning: reasoning.into(),
            ..Self::default()
        }
    }
}

/// Project any stage result through its role's projection.
pub fn project(result: &StageResult) -> Vec<ThinkingEntry> {
    match result.role() {
        AgentRole::Advocate => advocate(&AdvocateCase::from_result(result)),
        AgentRole::Skeptic => skeptic(&SkepticCase::from_result(result)),
        AgentRole::Auditor => auditor(&AuditReport::from_result(result)),
        AgentRole::Decision => decision(&DecisionReport::from_result(result)),
    }
}

fn track_word(track: Track) -> &'static str {
    match track {
        Track::Customer => "customer",
        Track::Partner => "partner",
    }
}

pub fn advocate(case: &AdvocateCase) -> Vec<ThinkingEntry> {
    let mut out = Vec::new();
    for track in Track::BOTH {
        for signal in case.signals_for(track).take(MAX_PER_LIST) {
            out.push(ThinkingEntry {
                strength: signal.strength.clone(),
                source: signal.source.clone(),
                ..ThinkingEntry::new(
                    signal.signal.clone(),
                    signal
                        .reasoning
                        .clone()
                        .unwrap_or_else(|| format!("Supports the {} case", track_word(track))),
                )
            });
        }
        if let Some(argument) = case.key_argument.get(track) {
            let score = case
                .score
                .for_track(track)
                .map(|s| format!(" (score {s}/100)"))
                .unwrap_or_default();
            out.push(ThinkingEntry::new(
                format!("Strongest {} argument{score}", track_word(track)),
                argument.clone(),
            ));
        }
    }
    dedup_both_tagged(out)
}

pub fn skeptic(case: &SkepticCase) -> Vec<ThinkingEntry> {
    let mut out = Vec::new();
    for track in Track::BOTH {
        if let Some(killer) = case.deal_killer.get(track) {
            out.push(ThinkingEntry {
                severity: Some("CRITICAL".to_string()),
                ..ThinkingEntry::new(
                    format!("Deal killer on the {} track", track_word(track)),
                    killer.clone(),
                )
            });
        }
        for flag in case.red_flags_for(track).take(MAX_PER_LIST) {
            out.push(ThinkingEntry {
                severity: flag.severity.clone(),
                source: flag.source.clone(),
                ..ThinkingEntry::new(
                    flag.flag.clone(),
                    flag.impact
                        .clone()
                        .unwrap_or_else(|| format!("Weakens the {} case", track_word(track))),
                )
            });
        }
    }
    if let Some(risk) = &case.competitor_risk {
        if risk.has_competitor_contract == Some(true) {
            let who = risk.competitor_name.as_deref().unwrap_or("a competitor");
            out.push(ThinkingEntry {
                severity: risk.threat_level.clone(),
                ..ThinkingEntry::new(
                    format!("Existing contract with {who}"),
                    risk.details
                        .clone()
                        .unwrap_or_else(|| "Incumbent vendor lock-in".to_string()),
                )
            });
        }
    }
    dedup_both_tagged(out)
}

pub fn auditor(report: &AuditReport) -> Vec<ThinkingEntry> {
    let mut out = Vec::new();
    for track in Track::BOTH {
        let Some(audit) = report.audits.get(track) else {
            continue;
        };
        if let Some(score) = audit.evidence_score {
            out.push(ThinkingEntry::new(
                format!("{} evidence quality {score}/100", track.label()),
                format!(
                    "{} strong, {} weak claims",
                    audit.strong_claims.len(),
                    audit.weak_claims.len()
                ),
            ));
        }
        for weak in audit.weak_claims.iter().take(MAX_PER_LIST) {
            out.push(ThinkingEntry::new(
                weak.claim.clone(),
                weak.weakness
                    .clone()
                    .or_else(|| weak.evidence_gap.clone())
                    .unwrap_or_else(|| "Weaker than asserted".to_string()),
            ));
        }
    }
    for finding in report.missing_context.iter().take(MAX_PER_LIST) {
        out.push(ThinkingEntry {
            impact: finding.impact.map(|i| i.as_str().to_string()),
            source: finding.source.clone(),
            ..ThinkingEntry::new(
                finding.finding.clone(),
                finding.explanation.clone().unwrap_or_default(),
            )
        });
    }
    if let Some(fact) = &report.critical_overlooked_fact {
        out.push(ThinkingEntry::new(
            fact.clone(),
            "Most important fact both sides missed",
        ));
    }
    if let Some(split) = &report.split_verdict {
        let strength = |t: Track| split.strength.get(t).map(|s| s.as_str()).unwrap_or("UNKNOWN");
        out.push(ThinkingEntry::new(
            format!(
                "Split verdict: customer {}, partner {}",
                strength(Track::Customer),
                strength(Track::Partner)
            ),
            split.reasoning.clone().unwrap_or_default(),
        ));
    }
    out
}

pub fn decision(report: &DecisionReport) -> Vec<ThinkingEntry> {
    let mut out = Vec::new();
    for track in Track::BOTH {
        let Some(t) = report.track(track) else {
            continue;
        };
        let Some(verdict) = t.verdict else {
            continue;
        };
        let confidence = t
            .confidence
            .map(|c| format!(" at {c}% confidence"))
            .unwrap_or_default();
        let reasoning = t
            .deciding_factors
            .as_ref()
            .and_then(|f| f.key_swing_factor.clone())
            .or_else(|| t.regret_score.as_ref().and_then(|r| r.reason.clone()))
            .unwrap_or_default();
        out.push(ThinkingEntry {
            strength: t.regret_score.as_ref().and_then(|r| r.score).map(|s| format!("REGRET {s}")),
            ..ThinkingEntry::new(
                format!("{} verdict: {verdict}{confidence}", track.label()),
                reasoning,
            )
        });
    }
    if let Some(approach) = &report.recommended_approach {
        out.push(ThinkingEntry::new(
            format!("Recommended approach: {approach}"),
            report.recommended_approach_reason.clone().unwrap_or_default(),
        ));
    }
    out
}

/// A `BOTH`-tagged finding shows up under each track; keep the first.
fn dedup_both_tagged(entries: Vec<ThinkingEntry>) -> Vec<ThinkingEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.fact.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{parse_stage_output, ContractPolicy};
    use serde_json::json;

    fn result(role: AgentRole, v: serde_json::Value) -> StageResult {
        parse_stage_output(role, &v.to_string(), &ContractPolicy::default()).unwrap()
    }

    #[test]
    fn advocate_trace_carries_strength_and_source() {
        let r = result(
            AgentRole::Advocate,
            json!({
                "agentRole": "BULL", "companyName": "Acme", "overallBullScore": 80,
                "topSignals": [{"signal": "Raised $50M", "strength": "HIGH", "source": "https://news"}],
                "keyArgument": "Cash to spend"
            }),
        );
        let trace = project(&r);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].fact, "Raised $50M");
        assert_eq!(trace[0].strength.as_deref(), Some("HIGH"));
        assert_eq!(trace[0].source.as_deref(), Some("https://news"));
        assert_eq!(trace[1].fact, "Strongest customer argument (score 80/100)");
    }

    #[test]
    fn missing_optional_fields_yield_empty_trace() {
        let r = result(
            AgentRole::Skeptic,
            json!({"agentRole": "BEAR", "companyName": "Acme", "overallBearScore": 20}),
        );
        assert!(project(&r).is_empty());
    }

    #[test]
    fn both_tagged_signal_listed_once() {
        let r = result(
            AgentRole::Advocate,
            json!({
                "agentRole": "BULL", "companyName": "Acme",
                "overallBullScore": {"customerScore": 50, "partnerScore": 50},
                "topSignals": [{"signal": "Public API", "track": "BOTH"}]
            }),
        );
        let trace = project(&r);
        assert_eq!(trace.iter().filter(|e| e.fact == "Public API").count(), 1);
    }

    #[test]
    fn decision_trace_lists_each_present_track() {
        let r = result(
            AgentRole::Decision,
            json!({
                "agentRole": "ORCHESTRATOR", "companyName": "Acme",
                "verdict": "PURSUE", "confidence": 75,
                "regretScore": {"score": 80, "reason": "Budget window closing"},
                "outreachEmail": {"subject": "Scaling", "body": "Hi"}
            }),
        );
        let trace = project(&r);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].fact, "CUSTOMER verdict: PURSUE at 75% confidence");
        assert_eq!(trace[0].reasoning, "Budget window closing");
        assert_eq!(trace[0].strength.as_deref(), Some("REGRET 80"));
    }

    #[test]
    fn optional_fields_are_omitted_from_json() {
        let entry = ThinkingEntry::new("fact", "why");
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v, json!({"fact": "fact", "reasoning": "why"}));
    }
}
