//! Decision ("Orchestrator") result view.

use serde::Serialize;
use serde_json::Value;

use super::fields::{label, object_any, score, score_field, text, text_any, texts};
use super::{PerTrack, SchemaVersion, StageResult, Track, Verdict};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegretScore {
    pub score: Option<u8>,
    pub reason: Option<String>,
}

impl RegretScore {
    /// Accepts `{score, reason}` or a bare number.
    fn read(v: &Value) -> Option<Self> {
        match v {
            Value::Object(_) => Some(Self {
                score: score_field(v, "score"),
                reason: text(v, "reason"),
            }),
            Value::Number(_) => Some(Self {
                score: score(v),
                reason: None,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMaker {
    pub title: Option<String>,
    pub why: Option<String>,
    pub linkedin_search_tip: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutreachEmail {
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecidingFactors {
    pub strongest_bull_signal: Option<String>,
    pub strongest_bear_signal: Option<String>,
    pub detective_impact: Option<String>,
    pub key_swing_factor: Option<String>,
}

/// Verdict and follow-up material for one track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackDecision {
    pub verdict: Option<Verdict>,
    pub confidence: Option<u8>,
    pub regret_score: Option<RegretScore>,
    pub deciding_factors: Option<DecidingFactors>,
    pub target_decision_maker: Option<DecisionMaker>,
    pub outreach_email: Option<OutreachEmail>,
    pub if_hold: Option<String>,
    pub if_avoid: Option<String>,
}

impl TrackDecision {
    fn read(v: &Value) -> Self {
        Self {
            verdict: text(v, "verdict").and_then(|s| s.parse().ok()),
            confidence: score_field(v, "confidence"),
            regret_score: v.get("regretScore").and_then(RegretScore::read),
            deciding_factors: object_any(v, &["decidingFactors"]).map(|f| DecidingFactors {
                strongest_bull_signal: text(f, "strongestBullSignal"),
                strongest_bear_signal: text(f, "strongestBearSignal"),
                detective_impact: text(f, "detectiveImpact"),
                key_swing_factor: text(f, "keySwingFactor"),
            }),
            target_decision_maker: object_any(v, &["targetDecisionMaker"]).map(|d| {
                DecisionMaker {
                    title: text(d, "title"),
                    why: text(d, "why"),
                    linkedin_search_tip: text(d, "linkedinSearchTip"),
                }
            }),
            outreach_email: object_any(v, &["outreachEmail"]).map(|e| OutreachEmail {
                subject: text(e, "subject"),
                body: text(e, "body"),
            }),
            if_hold: text(v, "ifHold"),
            if_avoid: text(v, "ifAvoid"),
        }
    }

    /// Fill fields missing on this track from the top level of a dual-track
    /// result. Verdict, confidence and regret fall back on either track; the
    /// outreach material only on the customer track.
    fn inherit_from(&mut self, top: &TrackDecision, track: Track) {
        if self.verdict.is_none() {
            self.verdict = top.verdict;
        }
        if self.confidence.is_none() {
            self.confidence = top.confidence;
        }
        if self.regret_score.is_none() {
            self.regret_score = top.regret_score.clone();
        }
        if track == Track::Partner {
            return;
        }
        if self.deciding_factors.is_none() {
            self.deciding_factors = top.deciding_factors.clone();
        }
        if self.target_decision_maker.is_none() {
            self.target_decision_maker = top.target_decision_maker.clone();
        }
        if self.outreach_email.is_none() {
            self.outreach_email = top.outreach_email.clone();
        }
    }
}

/// `key` on a track object, or on the enclosing result when the track
/// leaves it out. Nulls count as absent.
pub(crate) fn inherited<'a>(track: &'a Value, top: &'a Value, key: &str) -> Option<&'a Value> {
    present(track, key).or_else(|| present(top, key))
}

pub(crate) fn present<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|x| !x.is_null())
}

/// Canonical dual-track view of a decision result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionReport {
    pub schema: SchemaVersion,
    pub company_name: String,
    pub tracks: PerTrack<Option<TrackDecision>>,
    /// Raw proposal, uppercased; reconciled against the verdicts elsewhere.
    pub recommended_approach: Option<String>,
    pub recommended_approach_reason: Option<String>,
    pub executive_summary: Option<String>,
    pub client_advantages: Vec<String>,
    pub client_disadvantages: Vec<String>,
    pub next_steps: Vec<String>,
}

impl DecisionReport {
    pub fn from_result(result: &StageResult) -> Self {
        let body = result.body();
        let tracks = match result.schema() {
            // The flat legacy fields describe the single (customer) track.
            SchemaVersion::Legacy => PerTrack::new(Some(TrackDecision::read(body)), None),
            SchemaVersion::DualTrack => {
                let top = TrackDecision::read(body);
                let read = |track: Track, key: &str| {
                    object_any(body, &[key]).map(|v| {
                        let mut decision = TrackDecision::read(v);
                        decision.inherit_from(&top, track);
                        decision
                    })
                };
                PerTrack::new(
                    read(Track::Customer, "customerTrack"),
                    read(Track::Partner, "partnerTrack"),
                )
            }
        };

        Self {
            schema: result.schema(),
            company_name: result.company_name(),
            tracks,
            recommended_approach: label(body, "recommendedApproach"),
            recommended_approach_reason: text(body, "recommendedApproachReason"),
            executive_summary: text_any(body, &["executiveSummary", "verdictSummary"]),
            client_advantages: texts(body, "clientAdvantages"),
            client_disadvantages: texts(body, "clientDisadvantages"),
            next_steps: texts(body, "nextSteps"),
        }
    }

    pub fn track(&self, track: Track) -> Option<&TrackDecision> {
        self.tracks.get(track).as_ref()
    }

    pub fn verdict(&self, track: Track) -> Option<Verdict> {
        self.track(track).and_then(|t| t.verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{parse_stage_output, ContractPolicy};
    use crate::schema::AgentRole;
    use serde_json::json;

    fn parse(v: Value) -> StageResult {
        parse_stage_output(AgentRole::Decision, &v.to_string(), &ContractPolicy::default())
            .expect("valid decision output")
    }

    #[test]
    fn legacy_flat_fields_become_customer_track() {
        let report = DecisionReport::from_result(&parse(json!({
            "agentRole": "ORCHESTRATOR",
            "companyName": "Acme",
            "verdictSummary": "Strong timing.",
            "verdict": "PURSUE",
            "confidence": 75,
            "regretScore": {"score": 80, "reason": "Budget cycle closes soon"},
            "outreachEmail": {"subject": "Scaling", "body": "Hi"},
            "ifHold": null,
            "ifAvoid": null
        })));
        assert_eq!(report.schema, SchemaVersion::Legacy);
        assert_eq!(report.verdict(Track::Customer), Some(Verdict::Pursue));
        assert_eq!(report.verdict(Track::Partner), None);
        assert!(report.track(Track::Partner).is_none());
        let customer = report.track(Track::Customer).expect("customer");
        assert_eq!(customer.confidence, Some(75));
        assert_eq!(customer.regret_score.as_ref().and_then(|r| r.score), Some(80));
        assert_eq!(report.executive_summary.as_deref(), Some("Strong timing."));
    }

    #[test]
    fn dual_track_customer_inherits_top_level_material() {
        let report = DecisionReport::from_result(&parse(json!({
            "agentRole": "ORCHESTRATOR",
            "companyName": "Acme",
            "customerTrack": {"verdict": "PURSUE", "confidence": 70},
            "partnerTrack": {"verdict": "HOLD", "confidence": 50, "ifHold": "Revisit after API launch"},
            "regretScore": {"score": 60, "reason": "Competitor is circling"},
            "outreachEmail": {"subject": "Top-level", "body": "Body"},
            "recommendedApproach": "Customer_Now_Partner_Later",
            "nextSteps": ["Call CTO"]
        })));
        let customer = report.track(Track::Customer).expect("customer");
        assert_eq!(
            customer.outreach_email.as_ref().and_then(|e| e.subject.as_deref()),
            Some("Top-level")
        );
        assert_eq!(customer.regret_score.as_ref().and_then(|r| r.score), Some(60));
        let partner = report.track(Track::Partner).expect("partner");
        assert_eq!(partner.outreach_email, None);
        assert_eq!(partner.confidence, Some(50));
        assert_eq!(partner.regret_score.as_ref().and_then(|r| r.score), Some(60));
        assert_eq!(partner.if_hold.as_deref(), Some("Revisit after API launch"));
        assert_eq!(
            report.recommended_approach.as_deref(),
            Some("CUSTOMER_NOW_PARTNER_LATER")
        );
        assert_eq!(report.next_steps, vec!["Call CTO".to_string()]);
    }

    #[test]
    fn bare_number_regret_is_accepted() {
        let report = DecisionReport::from_result(&parse(json!({
            "agentRole": "ORCHESTRATOR",
            "companyName": "Acme",
            "verdict": "HOLD",
            "confidence": 55,
            "regretScore": 40
        })));
        let regret = report
            .track(Track::Customer)
            .and_then(|t| t.regret_score.clone())
            .expect("regret");
        assert_eq!(regret, RegretScore { score: Some(40), reason: None });
    }
}
