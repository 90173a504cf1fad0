//! Advocate ("Bull") result view.

use serde::Serialize;
use serde_json::Value;

use super::fields::{self, array, label, text, text_any};
use super::{
    read_observations, PerTrack, SchemaVersion, Situation, StageResult, Track, TrackScores,
    TrackTag,
};

/// One evidenced positive signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub track: TrackTag,
    pub signal: String,
    pub source: Option<String>,
    /// `HIGH` / `MEDIUM` / `LOW`, uppercased.
    pub strength: Option<String>,
    /// Why this matters to the client (customer) or how it connects (partner).
    pub reasoning: Option<String>,
    /// Partner-only: integration / reseller / co-sell.
    pub partner_type: Option<String>,
}

/// Canonical dual-track view of an advocate result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvocateCase {
    pub schema: SchemaVersion,
    pub company_name: String,
    pub score: TrackScores,
    pub signals: Vec<Signal>,
    pub key_argument: PerTrack<Option<String>>,
    /// Openings created by technical debt, budget pressure or a pivot.
    pub opportunities: Situation,
}

impl AdvocateCase {
    pub fn from_result(result: &StageResult) -> Self {
        let body = result.body();
        let mut case = match result.schema() {
            SchemaVersion::Legacy => from_legacy(body),
            SchemaVersion::DualTrack => from_dual(body),
        };
        case.schema = result.schema();
        case.company_name = result.company_name();
        case.opportunities = read_opportunities(body);
        case
    }

    pub fn signals_for(&self, track: Track) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(move |s| s.track.applies_to(track))
    }

    pub fn has_high_strength_signal(&self) -> bool {
        self.signals
            .iter()
            .any(|s| s.strength.as_deref() == Some("HIGH"))
    }
}

fn from_legacy(body: &Value) -> AdvocateCase {
    let mut signals = read_signals(body, "topSignals", TrackTag::CustomerSignal);
    signals.extend(read_signals(body, "clientRelevantSignals", TrackTag::CustomerSignal));

    AdvocateCase {
        schema: SchemaVersion::Legacy,
        company_name: String::new(),
        score: body.get("overallBullScore").map(TrackScores::read).unwrap_or_default(),
        signals,
        key_argument: read_key_argument(body),
        opportunities: Situation::default(),
    }
}

fn from_dual(body: &Value) -> AdvocateCase {
    let mut signals = read_signals(body, "customerSignals", TrackTag::CustomerSignal);
    signals.extend(read_signals(body, "partnerSignals", TrackTag::PartnerSignal));
    // Some dual-track outputs keep a single tagged list.
    signals.extend(read_signals(body, "topSignals", TrackTag::Both));

    AdvocateCase {
        schema: SchemaVersion::DualTrack,
        company_name: String::new(),
        score: body.get("overallBullScore").map(TrackScores::read).unwrap_or_default(),
        signals,
        key_argument: read_key_argument(body),
        opportunities: Situation::default(),
    }
}

fn read_opportunities(body: &Value) -> Situation {
    const HELPS: &[&str] = &["howClientHelps", "clientHelps"];
    Situation {
        technical_debt: read_observations(body, &["technicalDebtSignals"], HELPS),
        fiscal_pressure: read_observations(body, &["fiscalPressureSignals"], HELPS),
        recent_pivots: read_observations(
            body,
            &["recentPivotSignals", "pivotSignals"],
            &["newRequirement"],
        ),
    }
}

/// `keyArgument` is a plain string (customer only) or `{asCustomer, asPartner}`.
fn read_key_argument(body: &Value) -> PerTrack<Option<String>> {
    match body.get("keyArgument") {
        Some(v) if v.is_object() => PerTrack::new(
            text_any(v, &["asCustomer", "customer"]),
            text_any(v, &["asPartner", "partner"]),
        ),
        _ => PerTrack::new(text(body, "keyArgument"), None),
    }
}

fn read_signals(body: &Value, key: &str, default_track: TrackTag) -> Vec<Signal> {
    array(body, key)
        .iter()
        .filter_map(|item| {
            let signal = match item {
                Value::String(_) => fields::as_text(item)?,
                _ => text_any(item, &["signal", "finding", "fact"])?,
            };
            let track = text(item, "track")
                .and_then(|t| TrackTag::parse(&t))
                .unwrap_or(default_track);
            Some(Signal {
                track,
                signal,
                source: text(item, "source"),
                strength: label(item, "strength"),
                reasoning: text_any(
                    item,
                    &["clientConnection", "partnerConnection", "reasoning", "relevance"],
                ),
                partner_type: text(item, "partnerType"),
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
        parse_stage_output(AgentRole::Advocate, &v.to_string(), &ContractPolicy::default())
            .expect("valid advocate output")
    }

    #[test]
    fn legacy_signals_land_on_customer_track() {
        let result = parse(json!({
            "agentRole": "BULL",
            "companyName": "Acme",
            "overallBullScore": 80,
            "topSignals": [{"signal": "Raised Series B", "strength": "high", "source": "techcrunch"}],
            "keyArgument": "Fresh funding"
        }));
        let case = AdvocateCase::from_result(&result);
        assert_eq!(case.schema, SchemaVersion::Legacy);
        assert_eq!(case.score.customer_score, Some(80));
        assert_eq!(case.signals_for(Track::Customer).count(), 1);
        assert_eq!(case.signals_for(Track::Partner).count(), 0);
        assert!(case.has_high_strength_signal());
        assert_eq!(case.key_argument.customer.as_deref(), Some("Fresh funding"));
        assert_eq!(case.key_argument.partner, None);
        assert!(case.opportunities.is_empty());
    }

    #[test]
    fn situational_opportunities_are_read() {
        let result = parse(json!({
            "agentRole": "BULL",
            "companyName": "Acme",
            "overallBullScore": 72,
            "technicalDebtSignals": [
                {"observation": "Still on a 2014 Jenkins farm", "howClientHelps": "Managed pipelines"}
            ],
            "fiscalPressureSignals": [],
            "recentPivotSignals": [{
                "observation": "Moving to usage-based pricing",
                "newRequirement": "Metering per tenant",
                "clientFit": "Strong"
            }]
        }));
        let case = AdvocateCase::from_result(&result);
        let tech = &case.opportunities.technical_debt;
        assert_eq!(tech.len(), 1);
        assert_eq!(tech[0].implication.as_deref(), Some("Managed pipelines"));
        assert!(case.opportunities.fiscal_pressure.is_empty());
        let pivot = &case.opportunities.recent_pivots[0];
        assert_eq!(pivot.implication.as_deref(), Some("Metering per tenant"));
        assert_eq!(pivot.client_fit.as_deref(), Some("Strong"));
        let headings: Vec<_> = case.opportunities.sections().map(|(h, _)| h).collect();
        assert_eq!(headings, ["Technical Debt", "Recent Pivots"]);
    }

    #[test]
    fn dual_track_signals_keep_their_tracks() {
        let result = parse(json!({
            "agentRole": "BULL",
            "companyName": "Acme",
            "overallBullScore": {"customerScore": 70, "partnerScore": 55, "combinedScore": 63},
            "customerSignals": [{"signal": "Hiring SREs", "strength": "MEDIUM", "clientConnection": "needs tooling"}],
            "partnerSignals": [{"signal": "Opened API", "partnerConnection": "integration", "partnerType": "INTEGRATION"}],
            "keyArgument": {"asCustomer": "Scaling pain", "asPartner": "Open platform"}
        }));
        let case = AdvocateCase::from_result(&result);
        assert_eq!(case.schema, SchemaVersion::DualTrack);
        assert_eq!(case.score.partner_score, Some(55));
        assert!(!case.has_high_strength_signal());
        let partner: Vec<_> = case.signals_for(Track::Partner).collect();
        assert_eq!(partner.len(), 1);
        assert_eq!(partner[0].partner_type.as_deref(), Some("INTEGRATION"));
        assert_eq!(partner[0].reasoning.as_deref(), Some("integration"));
        assert_eq!(case.key_argument.partner.as_deref(), Some("Open platform"));
    }
}
