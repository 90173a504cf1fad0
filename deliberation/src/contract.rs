//! Parse-or-fail boundary between free-text model output and [`StageResult`].
//!
//! ```text
//! raw text ─► strip ``` fences ─► one JSON object ─► role checks ─► StageResult
//!                                                     │
//!                                                     └─► StageError::MalformedOutput
//! ```
//!
//! Nothing is repaired here. A response either satisfies the whole contract
//! or the stage fails.

use serde_json::Value;
use tracing::{debug, warn};

use crate::approach;
use crate::error::StageError;
use crate::schema::{decision, fields};
use crate::schema::{AgentRole, SchemaVersion, StageResult, Track, Verdict};

/// Knobs for the decision-stage consistency check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractPolicy {
    /// Reject a `recommendedApproach` that contradicts the verdict pair
    /// instead of recording the violation and deriving a permitted one.
    pub strict_approach: bool,
}

/// Validate raw backend text for `role`.
///
/// # Errors
///
/// [`StageError::MalformedOutput`] for anything that is not exactly one JSON
/// object honoring the role's required keys.
pub fn parse_stage_output(
    role: AgentRole,
    raw: &str,
    policy: &ContractPolicy,
) -> Result<StageResult, StageError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(StageError::malformed(role, "empty response"));
    }

    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| StageError::malformed(role, format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(StageError::malformed(role, "top-level value is not an object"));
    }

    check_common(role, &value)?;
    match role {
        AgentRole::Advocate => check_score(role, &value, "overallBullScore")?,
        AgentRole::Skeptic => check_score(role, &value, "overallBearScore")?,
        AgentRole::Auditor => check_auditor(role, &value)?,
        AgentRole::Decision => check_decision(role, &value, policy)?,
    }

    let schema = SchemaVersion::detect(role, &value);
    debug!(stage = %role, schema = ?schema, "stage output accepted");
    Ok(StageResult::new(role, schema, value))
}

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...) up to the first newline.
        s = match rest.find('\n') {
            Some(idx) if rest[..idx].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[idx + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        s = s.trim_end();
        s = s.strip_suffix("```").unwrap_or(s);
    }
    s.trim()
}

fn check_common(role: AgentRole, body: &Value) -> Result<(), StageError> {
    match body.get("agentRole").and_then(Value::as_str) {
        Some(tag) if tag.trim().eq_ignore_ascii_case(role.tag()) => {}
        Some(other) => {
            return Err(StageError::malformed(
                role,
                format!("agentRole {other:?} does not match {}", role.tag()),
            ))
        }
        None => return Err(StageError::malformed(role, "missing agentRole")),
    }
    match body.get("companyName") {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(StageError::malformed(role, "companyName is not a string")),
        None => Err(StageError::malformed(role, "missing companyName")),
    }
}

/// Scores are a 1–100 number or `{customerScore, partnerScore[, combinedScore]}`.
fn check_score(role: AgentRole, body: &Value, key: &str) -> Result<(), StageError> {
    let Some(score) = body.get(key) else {
        return Err(StageError::malformed(role, format!("missing {key}")));
    };
    match score {
        Value::Object(_) => {
            for sub in ["customerScore", "partnerScore"] {
                require_score(role, score, sub, key)?;
            }
            if score.get("combinedScore").is_some_and(|v| !v.is_null()) {
                require_score(role, score, "combinedScore", key)?;
            }
            Ok(())
        }
        other if fields::score(other).is_some() => Ok(()),
        _ => Err(StageError::malformed(role, format!("{key} must be a number 1-100"))),
    }
}

fn require_score(role: AgentRole, v: &Value, key: &str, parent: &str) -> Result<(), StageError> {
    if fields::score_field(v, key).is_some() {
        Ok(())
    } else {
        Err(StageError::malformed(
            role,
            format!("{parent}.{key} must be a number 1-100"),
        ))
    }
}

/// Present-but-invalid optional scores are violations; absent ones are not.
fn check_optional_score(role: AgentRole, v: &Value, key: &str, path: &str) -> Result<(), StageError> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(x) if fields::score(x).is_some() => Ok(()),
        Some(_) => Err(StageError::malformed(role, format!("{path} must be a number 1-100"))),
    }
}

fn check_auditor(role: AgentRole, body: &Value) -> Result<(), StageError> {
    let audit = ["customerTrackAudit", "bullAudit"]
        .iter()
        .find_map(|k| body.get(*k).map(|v| (*k, v)));
    match audit {
        Some((key, v)) if v.is_object() => {
            check_optional_score(role, v, "evidenceScore", &format!("{key}.evidenceScore"))?;
        }
        Some((key, _)) => {
            return Err(StageError::malformed(role, format!("{key} is not an object")))
        }
        None => {
            return Err(StageError::malformed(
                role,
                "missing customerTrackAudit (or legacy bullAudit)",
            ))
        }
    }
    for key in ["partnerTrackAudit", "bearAudit"] {
        if let Some(v) = body.get(key).filter(|v| v.is_object()) {
            check_optional_score(role, v, "evidenceScore", &format!("{key}.evidenceScore"))?;
        }
    }
    Ok(())
}

fn check_decision(role: AgentRole, body: &Value, policy: &ContractPolicy) -> Result<(), StageError> {
    let customer = decision::present(body, "customerTrack");
    let partner = decision::present(body, "partnerTrack");

    if customer.is_none() && partner.is_none() {
        // Legacy flat shape: the body is the customer track.
        check_track(role, body, None, Track::Customer)?;
        return Ok(());
    }

    let mut verdicts = [None, None];
    for (slot, (track, v)) in [(Track::Customer, customer), (Track::Partner, partner)]
        .into_iter()
        .enumerate()
    {
        let Some(v) = v else { continue };
        if !v.is_object() {
            return Err(StageError::malformed(
                role,
                format!("{} is not an object", track_key(track)),
            ));
        }
        verdicts[slot] = Some(check_track(role, v, Some(body), track)?);
    }

    if let [Some(c), Some(p)] = verdicts {
        let proposal = fields::text(body, "recommendedApproach");
        if let Err(violation) = approach::check_proposal(c, p, proposal.as_deref()) {
            if policy.strict_approach {
                return Err(StageError::malformed(role, violation.to_string()));
            }
            warn!(stage = %role, %violation, "inconsistent recommendedApproach");
        }
    }
    Ok(())
}

fn track_key(track: Track) -> &'static str {
    match track {
        Track::Customer => "customerTrack",
        Track::Partner => "partnerTrack",
    }
}

/// Every track owes a verdict, a confidence and a regret score; a PURSUE
/// track also owes an outreach email. Values missing on a dual-track object
/// are looked up on `top` the same way `DecisionReport` reads them.
fn check_track(
    role: AgentRole,
    v: &Value,
    top: Option<&Value>,
    track: Track,
) -> Result<Verdict, StageError> {
    let prefix = if top.is_some() {
        format!("{}.", track_key(track))
    } else {
        String::new()
    };
    let field = |key: &str| match top {
        Some(top) => decision::inherited(v, top, key),
        None => decision::present(v, key),
    };
    let malformed = |msg: String| StageError::malformed(role, msg);

    let verdict = match field("verdict").and_then(Value::as_str) {
        Some(s) => s
            .parse::<Verdict>()
            .map_err(|e| malformed(format!("{prefix}verdict: {e}")))?,
        None => return Err(malformed(format!("missing {prefix}verdict"))),
    };

    match field("confidence") {
        Some(c) if fields::score(c).is_some() => {}
        Some(_) => return Err(malformed(format!("{prefix}confidence must be a number 1-100"))),
        None => return Err(malformed(format!("missing {prefix}confidence"))),
    }

    let regret = match field("regretScore") {
        Some(r) if r.is_object() => decision::present(r, "score"),
        other => other,
    };
    match regret {
        Some(r) if fields::score(r).is_some() => {}
        Some(_) => {
            return Err(malformed(format!("{prefix}regretScore.score must be a number 1-100")))
        }
        None => return Err(malformed(format!("missing {prefix}regretScore"))),
    }

    if verdict == Verdict::Pursue {
        // Only the customer track may borrow the top-level email.
        let email = match (top, track) {
            (Some(top), Track::Customer) => decision::inherited(v, top, "outreachEmail"),
            _ => decision::present(v, "outreachEmail"),
        };
        let complete = email.is_some_and(|e| {
            fields::text(e, "subject").is_some() && fields::text(e, "body").is_some()
        });
        if !complete {
            return Err(malformed(format!(
                "PURSUE requires {prefix}outreachEmail with subject and body"
            )));
        }
    }
    Ok(verdict)
}
