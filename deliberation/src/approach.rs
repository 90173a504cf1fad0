//! Recommended-approach reconciliation.
//!
//! The decision stage proposes one approach for the pair of track verdicts.
//! The proposal is only accepted when it appears in the permitted set for
//! that pair:
//!
//! ```text
//! customer \ partner   PURSUE                         HOLD                           AVOID
//! PURSUE               BOTH_SIMULTANEOUSLY*           CUSTOMER_NOW_PARTNER_LATER*    CUSTOMER_FIRST*
//!                      CUSTOMER_NOW_PARTNER_LATER     CUSTOMER_FIRST
//!                      PARTNER_NOW_CUSTOMER_LATER
//! HOLD                 PARTNER_NOW_CUSTOMER_LATER*    NEITHER*                       NEITHER*
//!                      PARTNER_FIRST
//! AVOID                PARTNER_FIRST*                 NEITHER*                       NEITHER*
//! ```
//!
//! `*` marks the default. Resolution order: the decision's proposal, then the
//! auditor's sequencing advice, then the default. When a track has no
//! verdict at all (single-track results) the legacy fallback applies instead.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::Verdict;

/// One overall action combining both tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedApproach {
    CustomerFirst,
    PartnerFirst,
    BothSimultaneously,
    CustomerNowPartnerLater,
    PartnerNowCustomerLater,
    Neither,
}

impl RecommendedApproach {
    pub const ALL: [RecommendedApproach; 6] = [
        Self::CustomerFirst,
        Self::PartnerFirst,
        Self::BothSimultaneously,
        Self::CustomerNowPartnerLater,
        Self::PartnerNowCustomerLater,
        Self::Neither,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CustomerFirst => "CUSTOMER_FIRST",
            Self::PartnerFirst => "PARTNER_FIRST",
            Self::BothSimultaneously => "BOTH_SIMULTANEOUSLY",
            Self::CustomerNowPartnerLater => "CUSTOMER_NOW_PARTNER_LATER",
            Self::PartnerNowCustomerLater => "PARTNER_NOW_CUSTOMER_LATER",
            Self::Neither => "NEITHER",
        }
    }
}

impl fmt::Display for RecommendedApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendedApproach {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == normalized)
            .ok_or_else(|| format!("unknown approach {s:?}"))
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

use RecommendedApproach::*;

/// Permitted approaches for a verdict pair, default first.
pub fn permitted(customer: Verdict, partner: Verdict) -> &'static [RecommendedApproach] {
    use Verdict::{Avoid, Hold, Pursue};
    match (customer, partner) {
        (Pursue, Pursue) => &[BothSimultaneously, CustomerNowPartnerLater, PartnerNowCustomerLater],
        (Pursue, Hold) => &[CustomerNowPartnerLater, CustomerFirst],
        (Pursue, Avoid) => &[CustomerFirst],
        (Hold, Pursue) => &[PartnerNowCustomerLater, PartnerFirst],
        (Avoid, Pursue) => &[PartnerFirst],
        (Hold | Avoid, Hold | Avoid) => &[Neither],
    }
}

pub fn default_for(customer: Verdict, partner: Verdict) -> RecommendedApproach {
    permitted(customer, partner)[0]
}

pub fn is_permitted(customer: Verdict, partner: Verdict, approach: RecommendedApproach) -> bool {
    permitted(customer, partner).contains(&approach)
}

// ── Reconciliation ────────────────────────────────────────────────────────────

/// Where the final approach came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproachSource {
    /// The decision stage's own proposal, which was permitted.
    Proposed,
    /// The auditor's split-verdict sequencing advice.
    AuditorAdvice,
    /// The table default for the verdict pair.
    Derived,
    /// One track had no verdict; decided from the other alone.
    LegacyFallback,
}

/// A proposal that contradicts the verdict pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproachViolation {
    pub proposed: String,
    pub customer_verdict: Verdict,
    pub partner_verdict: Verdict,
}

impl fmt::Display for ApproachViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recommendedApproach {} is not permitted for customer {} / partner {}",
            self.proposed, self.customer_verdict, self.partner_verdict
        )
    }
}

/// Judge a proposal against a verdict pair.
///
/// Returns `Ok(Some(approach))` for a permitted proposal, `Ok(None)` when
/// nothing was proposed, and `Err` for unknown or forbidden labels.
pub fn check_proposal(
    customer: Verdict,
    partner: Verdict,
    proposal: Option<&str>,
) -> Result<Option<RecommendedApproach>, ApproachViolation> {
    let Some(raw) = proposal.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<RecommendedApproach>() {
        Ok(approach) if is_permitted(customer, partner, approach) => Ok(Some(approach)),
        _ => Err(ApproachViolation {
            proposed: raw.to_string(),
            customer_verdict: customer,
            partner_verdict: partner,
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub approach: RecommendedApproach,
    pub source: ApproachSource,
    pub violation: Option<ApproachViolation>,
}

/// Resolve the overall approach for a pair of (possibly missing) verdicts.
pub fn reconcile(
    customer: Option<Verdict>,
    partner: Option<Verdict>,
    proposal: Option<&str>,
    auditor_advice: Option<&str>,
) -> Reconciliation {
    let (customer, partner) = match (customer, partner) {
        (Some(c), Some(p)) => (c, p),
        (c, p) => return legacy_fallback(c, p),
    };

    let violation = match check_proposal(customer, partner, proposal) {
        Ok(Some(approach)) => {
            return Reconciliation {
                approach,
                source: ApproachSource::Proposed,
                violation: None,
            }
        }
        Ok(None) => None,
        Err(v) => Some(v),
    };

    if let Ok(Some(approach)) = check_proposal(customer, partner, auditor_advice) {
        return Reconciliation {
            approach,
            source: ApproachSource::AuditorAdvice,
            violation,
        };
    }

    Reconciliation {
        approach: default_for(customer, partner),
        source: ApproachSource::Derived,
        violation,
    }
}

fn legacy_fallback(customer: Option<Verdict>, partner: Option<Verdict>) -> Reconciliation {
    let approach = if customer == Some(Verdict::Pursue) {
        CustomerFirst
    } else if partner == Some(Verdict::Pursue) {
        PartnerFirst
    } else {
        Neither
    };
    Reconciliation {
        approach,
        source: ApproachSource::LegacyFallback,
        violation: None,
    }
}
