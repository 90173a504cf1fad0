//! Auditor ("Detective") result view.
//!
//! The legacy shape audits the two debaters (`bullAudit`, `bearAudit`) rather
//! than the two tracks. Both audits concern the single customer track, so the
//! adapter merges them: claims are concatenated and the evidence score is the
//! mean of the scores present. The partner audit stays `None`.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::fields::{array, label, score_field, text, text_any, texts};
use super::{PerTrack, SchemaVersion, StageResult, Track, TrackTag};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakClaim {
    pub claim: String,
    pub weakness: Option<String>,
    pub evidence_gap: Option<String>,
}

/// Evidence-quality audit of one track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAudit {
    pub evidence_score: Option<u8>,
    pub strong_claims: Vec<String>,
    pub weak_claims: Vec<WeakClaim>,
}

impl TrackAudit {
    fn read(v: &Value) -> Self {
        Self {
            evidence_score: score_field(v, "evidenceScore"),
            strong_claims: texts(v, "strongClaims"),
            weak_claims: array(v, "weakClaims")
                .iter()
                .filter_map(|item| {
                    Some(WeakClaim {
                        claim: text(item, "claim")?,
                        weakness: text(item, "weakness"),
                        evidence_gap: text(item, "evidenceGap"),
                    })
                })
                .collect(),
        }
    }

    fn merge(audits: &[TrackAudit]) -> Self {
        let scores: Vec<u32> = audits
            .iter()
            .filter_map(|a| a.evidence_score.map(u32::from))
            .collect();
        let evidence_score = if scores.is_empty() {
            None
        } else {
            let sum: u32 = scores.iter().sum();
            let len = scores.len() as u32;
            Some(((sum + len / 2) / len) as u8)
        };
        Self {
            evidence_score,
            strong_claims: audits.iter().flat_map(|a| a.strong_claims.clone()).collect(),
            weak_claims: audits.iter().flat_map(|a| a.weak_claims.clone()).collect(),
        }
    }
}

/// Direction in which an overlooked finding moves the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Impact {
    StrengthensBull,
    StrengthensBear,
    Neutral,
}

impl Impact {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "STRENGTHENS_BULL" => Some(Self::StrengthensBull),
            "STRENGTHENS_BEAR" => Some(Self::StrengthensBear),
            "NEUTRAL" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrengthensBull => "STRENGTHENS_BULL",
            Self::StrengthensBear => "STRENGTHENS_BEAR",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something neither debater surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlookedFinding {
    pub finding: String,
    pub source: Option<String>,
    pub track: TrackTag,
    pub impact: Option<Impact>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackStrength {
    Strong,
    Moderate,
    Weak,
}

impl TrackStrength {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "STRONG" => Some(Self::Strong),
            "MODERATE" => Some(Self::Moderate),
            "WEAK" => Some(Self::Weak),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "STRONG",
            Self::Moderate => "MODERATE",
            Self::Weak => "WEAK",
        }
    }
}

/// Independent per-track strength plus sequencing advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitVerdict {
    pub strength: PerTrack<Option<TrackStrength>>,
    /// Raw approach label; validated against the verdict pair during
    /// reconciliation, not here.
    pub recommended_approach: Option<String>,
    pub reasoning: Option<String>,
}

/// Canonical dual-track view of an auditor result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub schema: SchemaVersion,
    pub company_name: String,
    pub audits: PerTrack<Option<TrackAudit>>,
    pub missing_context: Vec<OverlookedFinding>,
    pub critical_overlooked_fact: Option<String>,
    pub investigation_gaps: Vec<String>,
    pub split_verdict: Option<SplitVerdict>,
    pub debate_confidence: Option<u8>,
}

impl AuditReport {
    pub fn from_result(result: &StageResult) -> Self {
        let body = result.body();
        let audits = match result.schema() {
            SchemaVersion::Legacy => {
                let debaters: Vec<TrackAudit> = ["bullAudit", "bearAudit"]
                    .iter()
                    .filter_map(|k| body.get(*k).filter(|v| v.is_object()))
                    .map(TrackAudit::read)
                    .collect();
                let customer = (!debaters.is_empty()).then(|| TrackAudit::merge(&debaters));
                PerTrack::new(customer, None)
            }
            SchemaVersion::DualTrack => PerTrack::new(
                body.get("customerTrackAudit")
                    .filter(|v| v.is_object())
                    .map(TrackAudit::read),
                body.get("partnerTrackAudit")
                    .filter(|v| v.is_object())
                    .map(TrackAudit::read),
            ),
        };

        Self {
            schema: result.schema(),
            company_name: result.company_name(),
            audits,
            missing_context: read_missing_context(body),
            critical_overlooked_fact: text(body, "criticalOverlookedFact"),
            investigation_gaps: texts(body, "investigationGaps"),
            split_verdict: body
                .get("splitVerdictAssessment")
                .filter(|v| v.is_object())
                .map(|v| SplitVerdict {
                    strength: PerTrack::new(
                        text(v, "customerTrackStrength").and_then(|s| TrackStrength::parse(&s)),
                        text(v, "partnerTrackStrength").and_then(|s| TrackStrength::parse(&s)),
                    ),
                    recommended_approach: label(v, "recommendedApproach"),
                    reasoning: text_any(v, &["splitReasoning", "reasoning"]),
                }),
            debate_confidence: score_field(body, "overallConfidenceInDebate"),
        }
    }

    pub fn evidence_score(&self, track: Track) -> Option<u8> {
        self.audits.get(track).as_ref().and_then(|a| a.evidence_score)
    }

    pub fn strength(&self, track: Track) -> Option<TrackStrength> {
        self.split_verdict
            .as_ref()
            .and_then(|s| *s.strength.get(track))
    }
}

fn read_missing_context(body: &Value) -> Vec<OverlookedFinding> {
    array(body, "missingContext")
        .iter()
        .filter_map(|item| {
            Some(OverlookedFinding {
                finding: text(item, "finding")?,
                source: text(item, "source"),
                track: text(item, "track")
                    .and_then(|t| TrackTag::parse(&t))
                    .unwrap_or(TrackTag::Both),
                impact: text(item, "impact").and_then(|i| Impact::parse(&i)),
                explanation: text_any(item, &["explanation", "clientRelevance"]),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{parse_stage_output, ContractPolicy};
    use crate::schema::AgentRole;
    use serde_json::json;

    fn parse(v: Value) -> StageResult {
        parse_stage_output(AgentRole::Auditor, &v.to_string(), &ContractPolicy::default())
            .expect("valid auditor output")
    }

    #[test]
    fn legacy_audits_merge_into_customer_track() {
        let report = AuditReport::from_result(&parse(json!({
            "agentRole": "DETECTIVE",
            "companyName": "Acme",
            "bullAudit": {"strongClaims": ["funding"], "weakClaims": [], "evidenceScore": 70},
            "bearAudit": {"strongClaims": [], "weakClaims": [{"claim": "layoffs", "weakness": "old news"}], "evidenceScore": 71},
            "missingContext": [{"finding": "New CTO", "impact": "strengthens bull"}]
        })));
        assert_eq!(report.schema, SchemaVersion::Legacy);
        assert_eq!(report.evidence_score(Track::Customer), Some(71));
        assert_eq!(report.evidence_score(Track::Partner), None);
        let customer = report.audits.customer.as_ref().expect("customer audit");
        assert_eq!(customer.strong_claims.len(), 1);
        assert_eq!(customer.weak_claims[0].weakness.as_deref(), Some("old news"));
        assert_eq!(report.missing_context[0].impact, Some(Impact::StrengthensBull));
        assert_eq!(report.split_verdict, None);
    }

    #[test]
    fn dual_track_reads_split_verdict() {
        let report = AuditReport::from_result(&parse(json!({
            "agentRole": "DETECTIVE",
            "companyName": "Acme",
            "customerTrackAudit": {"evidenceScore": 65},
            "partnerTrackAudit": {"evidenceScore": 40},
            "splitVerdictAssessment": {
                "customerTrackStrength": "strong",
                "partnerTrackStrength": "WEAK",
                "recommendedApproach": "customer_now_partner_later",
                "splitReasoning": "Buy first, integrate later"
            },
            "overallConfidenceInDebate": 72
        })));
        assert_eq!(report.evidence_score(Track::Partner), Some(40));
        assert_eq!(report.strength(Track::Customer), Some(TrackStrength::Strong));
        assert_eq!(report.strength(Track::Partner), Some(TrackStrength::Weak));
        let split = report.split_verdict.expect("split verdict");
        assert_eq!(
            split.recommended_approach.as_deref(),
            Some("CUSTOMER_NOW_PARTNER_LATER")
        );
        assert_eq!(report.debate_confidence, Some(72));
    }
}
