//! Skeptic ("Bear") result view.

use serde::Serialize;
use serde_json::Value;

use super::fields::{self, array, bool_field, label, text, text_any};
use super::{
    read_observations, PerTrack, SchemaVersion, Situation, StageResult, Track, TrackScores,
    TrackTag,
};

/// One evidenced negative finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedFlag {
    pub track: TrackTag,
    pub flag: String,
    pub source: Option<String>,
    /// `HIGH` / `MEDIUM` / `LOW`, uppercased.
    pub severity: Option<String>,
    /// Client impact (customer) or partnership impact (partner).
    pub impact: Option<String>,
    pub deal_breaking_potential: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorRisk {
    pub has_competitor_contract: Option<bool>,
    pub competitor_name: Option<String>,
    pub details: Option<String>,
    /// `HIGH` / `MEDIUM` / `LOW` / `UNKNOWN`.
    pub threat_level: Option<String>,
}

impl CompetitorRisk {
    fn read(v: &Value) -> Self {
        Self {
            has_competitor_contract: bool_field(v, "hasCompetitorContract"),
            competitor_name: text(v, "competitorName"),
            details: text(v, "details"),
            threat_level: label(v, "threatLevel"),
        }
    }
}

/// Canonical dual-track view of a skeptic result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkepticCase {
    pub schema: SchemaVersion,
    pub company_name: String,
    pub score: TrackScores,
    pub red_flags: Vec<RedFlag>,
    pub deal_killer: PerTrack<Option<String>>,
    pub competitor_risk: Option<CompetitorRisk>,
    pub financial_health: Option<String>,
    pub leadership_stability: Option<String>,
    pub key_argument: PerTrack<Option<String>>,
    /// Technical debt, budget pressure or a pivot working against the deal.
    pub barriers: Situation,
}

impl SkepticCase {
    pub fn from_result(result: &StageResult) -> Self {
        let body = result.body();
        let (red_flags, deal_killer) = match result.schema() {
            SchemaVersion::Legacy => legacy_findings(body),
            SchemaVersion::DualTrack => dual_findings(body),
        };
        Self {
            schema: result.schema(),
            company_name: result.company_name(),
            score: body
                .get("overallBearScore")
                .map(TrackScores::read)
                .unwrap_or_default(),
            red_flags,
            deal_killer,
            competitor_risk: fields::object_any(body, &["competitorRisk", "competitorLockIn"])
                .map(CompetitorRisk::read),
            financial_health: detail(body, &["financialHealth", "financialRisk"]),
            leadership_stability: detail(body, &["leadershipStability"]),
            key_argument: match body.get("keyArgument") {
                Some(v) if v.is_object() => PerTrack::new(
                    text_any(v, &["asCustomer", "customer"]),
                    text_any(v, &["asPartner", "partner"]),
                ),
                _ => PerTrack::new(text(body, "keyArgument"), None),
            },
            barriers: Situation {
                technical_debt: read_observations(
                    body,
                    &["technicalDebtBarriers"],
                    &["integrationRisk"],
                ),
                fiscal_pressure: read_observations(
                    body,
                    &["fiscalPressureBarriers"],
                    &["budgetRisk"],
                ),
                recent_pivots: read_observations(
                    body,
                    &["pivotRisks", "recentPivotRisks"],
                    &["relevancyRisk"],
                ),
            },
        }
    }

    pub fn red_flags_for(&self, track: Track) -> impl Iterator<Item = &RedFlag> {
        self.red_flags.iter().filter(move |f| f.track.applies_to(track))
    }

    /// True when the skeptic could not establish the competitor picture.
    pub fn competitor_threat_unknown(&self) -> bool {
        match &self.competitor_risk {
            None => true,
            Some(risk) => matches!(risk.threat_level.as_deref(), None | Some("UNKNOWN")),
        }
    }
}

/// A plain string, or the `details` member of a `{concerning, details}` record.
fn detail(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match body.get(*k)? {
        v @ Value::Object(_) => text(v, "details"),
        v => fields::as_text(v),
    })
}

fn legacy_findings(body: &Value) -> (Vec<RedFlag>, PerTrack<Option<String>>) {
    let mut flags = read_flags(body, "redFlags", TrackTag::CustomerSignal);
    flags.extend(read_flags(body, "clientRelevantRedFlags", TrackTag::CustomerSignal));
    let killer = PerTrack::new(text(body, "dealKiller"), None);
    (flags, killer)
}

fn dual_findings(body: &Value) -> (Vec<RedFlag>, PerTrack<Option<String>>) {
    let mut flags = read_flags(body, "customerRedFlags", TrackTag::CustomerSignal);
    flags.extend(read_flags(body, "partnerRedFlags", TrackTag::PartnerSignal));
    flags.extend(read_flags(body, "redFlags", TrackTag::Both));

    let killer = match body.get("dealKiller") {
        Some(v) if v.is_object() => PerTrack::new(
            text_any(v, &["customerDealKiller", "customer"]),
            text_any(v, &["partnerDealKiller", "partner"]),
        ),
        _ => PerTrack::new(text(body, "dealKiller"), None),
    };
    (flags, killer)
}

fn read_flags(body: &Value, key: &str, default_track: TrackTag) -> Vec<RedFlag> {
    array(body, key)
        .iter()
        .filter_map(|item| {
            let flag = match item {
                Value::String(_) => fields::as_text(item)?,
                _ => text_any(item, &["flag", "redFlag", "finding"])?,
            };
            Some(RedFlag {
                track: text(item, "track")
                    .and_then(|t| TrackTag::parse(&t))
                    .unwrap_or(default_track),
                flag,
                source: text(item, "source"),
                severity: label(item, "severity"),
                impact: text_any(item, &["clientImpact", "partnershipImpact", "impact"]),
                deal_breaking_potential: label(item, "dealBreakingPotential"),
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
        parse_stage_output(AgentRole::Skeptic, &v.to_string(), &ContractPolicy::default())
            .expect("valid skeptic output")
    }

    #[test]
    fn legacy_deal_killer_is_customer_only() {
        let case = SkepticCase::from_result(&parse(json!({
            "agentRole": "BEAR",
            "companyName": "Acme",
            "overallBearScore": 20,
            "clientRelevantRedFlags": [{"flag": "CFO left", "severity": "medium", "clientImpact": "slower deals"}],
            "dealKiller": "null"
        })));
        assert_eq!(case.score.customer_score, Some(20));
        assert_eq!(case.deal_killer, PerTrack::new(None, None));
        assert_eq!(case.red_flags_for(Track::Customer).count(), 1);
        assert_eq!(case.red_flags[0].severity.as_deref(), Some("MEDIUM"));
        assert!(case.competitor_threat_unknown());
    }

    #[test]
    fn dual_deal_killers_split_by_track() {
        let case = SkepticCase::from_result(&parse(json!({
            "agentRole": "BEAR",
            "companyName": "Acme",
            "overallBearScore": {"customerScore": 30, "partnerScore": 60},
            "customerRedFlags": [],
            "partnerRedFlags": [{"flag": "Exclusive deal with rival", "partnershipImpact": "blocks co-sell"}],
            "dealKiller": {"customerDealKiller": null, "partnerDealKiller": "Exclusive with rival"},
            "competitorRisk": {"hasCompetitorContract": true, "competitorName": "Rival", "threatLevel": "high"}
        })));
        assert_eq!(case.schema, SchemaVersion::DualTrack);
        assert_eq!(case.deal_killer.customer, None);
        assert_eq!(case.deal_killer.partner.as_deref(), Some("Exclusive with rival"));
        assert_eq!(case.red_flags_for(Track::Partner).count(), 1);
        assert_eq!(case.red_flags_for(Track::Customer).count(), 0);
        assert!(!case.competitor_threat_unknown());
        let risk = case.competitor_risk.expect("competitor risk");
        assert_eq!(risk.has_competitor_contract, Some(true));
        assert_eq!(risk.threat_level.as_deref(), Some("HIGH"));
    }

    #[test]
    fn health_fields_accept_records_or_text() {
        let case = SkepticCase::from_result(&parse(json!({
            "agentRole": "BEAR",
            "companyName": "Acme",
            "overallBearScore": 40,
            "financialHealth": {"concerning": true, "details": "Runway under a year", "source": "https://x.io"},
            "leadershipStability": "New CEO in March"
        })));
        assert_eq!(case.financial_health.as_deref(), Some("Runway under a year"));
        assert_eq!(case.leadership_stability.as_deref(), Some("New CEO in March"));
    }

    #[test]
    fn barriers_carry_their_risk() {
        let case = SkepticCase::from_result(&parse(json!({
            "agentRole": "BEAR",
            "companyName": "Acme",
            "overallBearScore": 55,
            "fiscalPressureBarriers": [
                {"observation": "Hiring freeze announced", "source": "https://x.io/freeze", "budgetRisk": "No new vendors this year"}
            ],
            "pivotRisks": ["Exiting the SMB segment"]
        })));
        let fiscal = &case.barriers.fiscal_pressure;
        assert_eq!(fiscal.len(), 1);
        assert_eq!(fiscal[0].implication.as_deref(), Some("No new vendors this year"));
        assert_eq!(fiscal[0].source.as_deref(), Some("https://x.io/freeze"));
        assert_eq!(case.barriers.recent_pivots[0].observation, "Exiting the SMB segment");
        assert!(case.barriers.technical_debt.is_empty());
    }
}
