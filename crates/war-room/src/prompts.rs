//! System prompts and user messages for each role.
//!
//! Prompts describe the dual-track JSON shape; the contract boundary also
//! accepts the older single-track shape, so a model that ignores the track
//! split still produces a usable run.

use deliberation::{AgentRole, StageResult, Target};

/// Upstream results visible to a stage. Unset entries are not yet known.
#[derive(Debug, Default, Clone, Copy)]
pub struct Upstream<'a> {
    pub advocate: Option<&'a StageResult>,
    pub skeptic: Option<&'a StageResult>,
    pub auditor: Option<&'a StageResult>,
}

fn client_context(product: &str, client_profile: &str) -> String {
    format!(
        "You work inside {product}, an autonomous B2B sales intelligence system.\n\n\
         CLIENT COMPANY CONTEXT:\n\
         The following describes the company doing the selling (our client):\n\
         {client_profile}\n\n\
         Every target is judged on two independent tracks:\n\
         - CUSTOMER: would the target BUY from our client?\n\
         - PARTNER: would the target make a good business PARTNER for our client \
         (integration, reseller, co-sell)?\n"
    )
}

const OUTPUT_RULES: &str = "OUTPUT RULES:\n\
- Return ONLY one valid JSON object\n\
- No markdown, no commentary, no text outside the JSON\n\
- Every score is an integer from 1 to 100\n";

const ADVOCATE_SCHEMA: &str = r#"Return this exact JSON:
{
  "agentRole": "BULL",
  "companyName": "<target company name>",
  "customerSignals": [
    {"signal": "<what you found>", "source": "<url>", "strength": "HIGH | MEDIUM | LOW",
     "clientConnection": "<why this makes them likely to buy from our client>"}
  ],
  "partnerSignals": [
    {"signal": "<what you found>", "source": "<url>", "strength": "HIGH | MEDIUM | LOW",
     "partnerType": "INTEGRATION | RESELLER | CO_SELL",
     "partnerConnection": "<how this connects to our client as a partner>"}
  ],
  "technicalDebtSignals": [{"observation": "<legacy system or scaling pain>", "source": "<url>",
                            "howClientHelps": "<what our client fixes>"}],
  "fiscalPressureSignals": [{"observation": "<cost pressure our client relieves>", "source": "<url>",
                             "howClientHelps": "<the saving our client brings>"}],
  "recentPivotSignals": [{"observation": "<recent strategic shift>", "source": "<url>",
                          "newRequirement": "<need the pivot creates>", "clientFit": "<how well our client fits>"}],
  "overallBullScore": {"customerScore": <1-100>, "partnerScore": <1-100>, "combinedScore": <1-100>},
  "keyArgument": {"asCustomer": "<strongest 2 sentence case>", "asPartner": "<strongest 2 sentence case>"}
}"#;

const SKEPTIC_SCHEMA: &str = r#"Return this exact JSON:
{
  "agentRole": "BEAR",
  "companyName": "<target company name>",
  "customerRedFlags": [
    {"flag": "<what you found>", "source": "<url>", "severity": "HIGH | MEDIUM | LOW",
     "clientImpact": "<why this hurts our client's chance of selling>",
     "dealBreakingPotential": "KILLS_DEAL | WEAKENS_POSITION | MINOR_CONCERN"}
  ],
  "partnerRedFlags": [
    {"flag": "<what you found>", "source": "<url>", "severity": "HIGH | MEDIUM | LOW",
     "partnershipImpact": "<why this hurts a partnership>",
     "dealBreakingPotential": "KILLS_DEAL | WEAKENS_POSITION | MINOR_CONCERN"}
  ],
  "technicalDebtBarriers": [{"observation": "<technical debt that blocks adoption>", "source": "<url>",
                             "integrationRisk": "<why onboarding our client is hard>"}],
  "fiscalPressureBarriers": [{"observation": "<cost cutting or budget freeze>", "source": "<url>",
                              "budgetRisk": "<why a purchase is unlikely now>"}],
  "pivotRisks": [{"observation": "<recent strategic shift>", "source": "<url>",
                  "relevancyRisk": "<how it moves them away from needing our client>"}],
  "competitorRisk": {"hasCompetitorContract": true, "competitorName": "<name>",
                     "details": "<what was announced>", "threatLevel": "HIGH | MEDIUM | LOW | UNKNOWN"},
  "financialHealth": {"concerning": true, "details": "<financial stress signals>", "source": "<url>"},
  "leadershipStability": {"stable": true, "details": "<leadership changes>"},
  "overallBearScore": {"customerScore": <1-100>, "partnerScore": <1-100>, "combinedScore": <1-100>},
  "keyArgument": {"asCustomer": "<strongest case against selling>", "asPartner": "<strongest case against partnering>"},
  "dealKiller": {"customerDealKiller": "<absolute deal-killing fact or null>", "partnerDealKiller": "<or null>"}
}"#;

const AUDITOR_SCHEMA: &str = r#"Return this exact JSON:
{
  "agentRole": "DETECTIVE",
  "companyName": "<target company name>",
  "customerTrackAudit": {
    "strongClaims": ["<well-evidenced claim>"],
    "weakClaims": [{"claim": "<claim>", "weakness": "<why it is weaker than asserted>",
                    "evidenceGap": "<what would verify it>"}],
    "evidenceScore": <1-100>
  },
  "partnerTrackAudit": { "strongClaims": [], "weakClaims": [], "evidenceScore": <1-100> },
  "missingContext": [
    {"finding": "<what neither agent found>", "source": "<url if found>",
     "track": "CUSTOMER_SIGNAL | PARTNER_SIGNAL | BOTH",
     "impact": "STRENGTHENS_BULL | STRENGTHENS_BEAR | NEUTRAL",
     "explanation": "<how this changes the picture>"}
  ],
  "criticalOverlookedFact": "<most important thing both agents missed>",
  "investigationGaps": ["<thing that should be researched but could not be found>"],
  "splitVerdictAssessment": {
    "customerTrackStrength": "STRONG | MODERATE | WEAK",
    "partnerTrackStrength": "STRONG | MODERATE | WEAK",
    "recommendedApproach": "CUSTOMER_FIRST | PARTNER_FIRST | BOTH_SIMULTANEOUSLY | CUSTOMER_NOW_PARTNER_LATER | PARTNER_NOW_CUSTOMER_LATER | NEITHER",
    "splitReasoning": "<why this sequencing>"
  },
  "overallConfidenceInDebate": <1-100>
}"#;

const DECISION_SCHEMA: &str = r#"Return this exact JSON:
{
  "agentRole": "ORCHESTRATOR",
  "companyName": "<target company name>",
  "executiveSummary": "<3-4 sentences explaining the full reasoning>",
  "customerTrack": {
    "verdict": "PURSUE | HOLD | AVOID",
    "confidence": <1-100>,
    "regretScore": {"score": <1-100>, "reason": "<one sentence: why NOW>"},
    "decidingFactors": {"strongestBullSignal": "", "strongestBearSignal": "",
                        "detectiveImpact": "", "keySwingFactor": ""},
    "targetDecisionMaker": {"title": "<job title>", "why": "<why this person>",
                            "linkedinSearchTip": "<search string>"},
    "outreachEmail": {"subject": "<specific subject>", "body": "<under 150 words>"},
    "ifHold": "<only if HOLD: trigger to re-evaluate, else null>",
    "ifAvoid": "<only if AVOID: what would need to change, else null>"
  },
  "partnerTrack": { "...": "same fields as customerTrack, judged as a partnership" },
  "recommendedApproach": "CUSTOMER_FIRST | PARTNER_FIRST | BOTH_SIMULTANEOUSLY | CUSTOMER_NOW_PARTNER_LATER | PARTNER_NOW_CUSTOMER_LATER | NEITHER",
  "recommendedApproachReason": "<one or two sentences>",
  "clientAdvantages": ["<why our client wins here>"],
  "clientDisadvantages": ["<where our client is exposed>"],
  "nextSteps": ["<concrete action>"]
}"#;

const APPROACH_RULES: &str = "RECOMMENDED APPROACH must agree with the two verdicts:\n\
- PURSUE + PURSUE: BOTH_SIMULTANEOUSLY, or CUSTOMER_NOW_PARTNER_LATER / PARTNER_NOW_CUSTOMER_LATER when sequencing is wiser\n\
- customer PURSUE only: CUSTOMER_FIRST, or CUSTOMER_NOW_PARTNER_LATER when the partner track is worth monitoring (HOLD)\n\
- partner PURSUE only: PARTNER_FIRST, or PARTNER_NOW_CUSTOMER_LATER when the customer track is worth monitoring (HOLD)\n\
- neither PURSUE: NEITHER\n";

pub fn system_prompt(role: AgentRole, product: &str, client_profile: &str) -> String {
    let context = client_context(product, client_profile);
    match role {
        AgentRole::Advocate => format!(
            "You are the Bull Agent.\n{context}\n\
             YOUR IDENTITY:\n\
             Your ONLY job is to find strong reasons to pursue this target, as a customer \
             and as a partner. You are optimistic and looking for buying and partnering \
             signals: recent funding, rapid hiring, product launches, leadership changes, \
             public complaints about current tooling, complementary technology.\n\
             Tag every signal with the track it supports. Never invent a source.\n\n\
             {OUTPUT_RULES}\n{ADVOCATE_SCHEMA}"
        ),
        AgentRole::Skeptic => format!(
            "You are the Bear Agent.\n{context}\n\
             YOUR IDENTITY:\n\
             You are a ruthless skeptic. Find every reason why pursuing this target would \
             waste our client's time: layoffs or hiring freezes, existing contracts with \
             our client's competitors, legal or regulatory trouble, leadership instability, \
             financial distress, technical decisions that conflict with our client's approach, \
             and pivots away from what our client solves.\n\
             Every red flag must say why it hurts OUR CLIENT specifically. No generic negatives.\n\n\
             {OUTPUT_RULES}\n{SKEPTIC_SCHEMA}"
        ),
        AgentRole::Auditor => format!(
            "You are the Detective Agent.\n{context}\n\
             YOUR IDENTITY:\n\
             You do not argue for or against pursuit. You audit the Bull and Bear findings: \
             which claims are well evidenced, which are weaker than asserted and what would \
             verify them, and what both agents missed. Score the evidence quality of each \
             track independently, then judge each track's strength on its own.\n\n\
             {APPROACH_RULES}\n{OUTPUT_RULES}\n{AUDITOR_SCHEMA}"
        ),
        AgentRole::Decision => format!(
            "You are the Orchestrator.\n{context}\n\
             YOUR IDENTITY:\n\
             You are the final decision-maker. You do NOT search the web; you reason over \
             the Bull, Bear and Detective findings only. Weight evidence by the Detective's \
             scores. A HIGH severity deal-killer outweighs several medium signals. Recency \
             matters.\n\n\
             VERDICTS (one per track, exactly PURSUE, HOLD or AVOID):\n\
             - PURSUE: strong signals, good timing, reach out this week\n\
             - HOLD: mixed signals, revisit in 60-90 days\n\
             - AVOID: red flags outweigh opportunity\n\n\
             Every track needs its own verdict, confidence and regretScore.\n\
             REGRET SCORE: 1-100, how much will we regret not reaching out TODAY, in 90 days?\n\
             OUTREACH EMAIL: one per PURSUE track, opens with a specific insight about THEIR \
             situation, stays under 150 words, quietly answers Bear's top objection, ends \
             with a low-friction call to action.\n\n\
             {APPROACH_RULES}\n{OUTPUT_RULES}\n{DECISION_SCHEMA}"
        ),
    }
}

/// The per-run user message. `evidence` is the rendered search text; the
/// decision stage never has any.
pub fn user_message(
    role: AgentRole,
    target: &Target,
    evidence: Option<&str>,
    upstream: &Upstream<'_>,
) -> String {
    let findings = |r: Option<&StageResult>| {
        r.map(StageResult::to_prompt_json)
            .unwrap_or_else(|| "null".to_string())
    };
    let evidence = evidence.unwrap_or("No results found.");
    match role {
        AgentRole::Advocate => format!(
            "Target Company: {}\nDomain: {}\n\nSEARCH RESULTS:\n{evidence}\n\n\
             Build the strongest possible bull case on both tracks. Return only JSON.",
            target.name, target.domain
        ),
        AgentRole::Skeptic => format!(
            "Target Company: {}\nDomain: {}\n\nSEARCH RESULTS:\n{evidence}\n\n\
             Build the strongest possible bear case relevant to our client. Return only JSON.",
            target.name, target.domain
        ),
        AgentRole::Auditor => format!(
            "Company: {} ({})\n\n\
             BULL AGENT FINDINGS:\n{}\n\n\
             BEAR AGENT FINDINGS:\n{}\n\n\
             ADDITIONAL SEARCH RESULTS:\n{evidence}\n\n\
             Audit both sets of findings. Identify weaknesses. \
             Surface what both agents missed. Return only JSON.",
            target.name,
            target.domain,
            findings(upstream.advocate),
            findings(upstream.skeptic),
        ),
        AgentRole::Decision => format!(
            "Company: {}\n\n\
             BULL FINDINGS:\n{}\n\n\
             BEAR FINDINGS:\n{}\n\n\
             DETECTIVE AUDIT:\n{}\n\n\
             Weigh all evidence. Make your final verdict for each track. Return only JSON.",
            target.name,
            findings(upstream.advocate),
            findings(upstream.skeptic),
            findings(upstream.auditor),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliberation::{parse_stage_output, ContractPolicy};

    fn target() -> Target {
        Target::parse("acme-corp.io").unwrap()
    }

    #[test]
    fn every_prompt_carries_profile_and_role_tag() {
        for role in AgentRole::ALL {
            let prompt = system_prompt(role, "ALLYVEX", "We sell observability tooling.");
            assert!(prompt.contains("We sell observability tooling."), "{role}");
            assert!(prompt.contains(&format!("\"agentRole\": \"{}\"", role.tag())), "{role}");
            assert!(prompt.contains("ALLYVEX"));
        }
    }

    #[test]
    fn decision_message_embeds_upstream_verbatim() {
        let bull = parse_stage_output(
            AgentRole::Advocate,
            r#"{"agentRole":"BULL","companyName":"Acme Corp","overallBullScore":80}"#,
            &ContractPolicy::default(),
        )
        .unwrap();
        let upstream = Upstream {
            advocate: Some(&bull),
            ..Upstream::default()
        };
        let msg = user_message(AgentRole::Decision, &target(), None, &upstream);
        assert!(msg.starts_with("Company: Acme Corp\n\nBULL FINDINGS:\n{"));
        assert!(msg.contains("\"overallBullScore\": 80"));
        assert!(msg.contains("BEAR FINDINGS:\nnull"));
        assert!(!msg.contains("SEARCH RESULTS"));
    }

    #[test]
    fn evidence_stages_show_search_results() {
        let msg = user_message(
            AgentRole::Skeptic,
            &target(),
            Some("=== q ===\nNo results found."),
            &Upstream::default(),
        );
        assert!(msg.contains("Domain: acme-corp.io"));
        assert!(msg.contains("SEARCH RESULTS:\n=== q ===\nNo results found."));
    }
}
