//! Document rendering: one dossier and one summary per track.
//!
//! Rendering is best-effort. [`render_all`] runs the four renders
//! concurrently; a failed render is logged and leaves its filename `None`
//! without touching the others.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use deliberation::artifacts::{artifact_filename, DocumentKind};
use deliberation::schema::{AdvocateCase, AuditReport, DecisionReport, Situation, SkepticCase};
use deliberation::{DocumentSet, Target, Track, TrackDocuments, TrackSummary, WarRoomReport};
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("render failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Write the long-form document for `track`; returns the bare filename.
    async fn render_dossier(&self, report: &WarRoomReport, track: Track) -> Result<String, RenderError>;

    /// Write the one-page summary for `track`; returns the bare filename.
    async fn render_summary(&self, report: &WarRoomReport, track: Track) -> Result<String, RenderError>;
}

/// Render every document for a finished run.
pub async fn render_all(renderer: &dyn DocumentRenderer, report: &WarRoomReport) -> DocumentSet {
    let jobs = Track::BOTH.into_iter().flat_map(|track| {
        DocumentKind::ALL.into_iter().map(move |kind| async move {
            let outcome = match kind {
                DocumentKind::Dossier => renderer.render_dossier(report, track).await,
                DocumentKind::Summary => renderer.render_summary(report, track).await,
            };
            (track, kind, outcome)
        })
    });

    let mut documents = DocumentSet::default();
    for (track, kind, outcome) in join_all(jobs).await {
        let name = match outcome {
            Ok(name) => {
                info!(track = %track.label(), kind = %kind, file = %name, "document rendered");
                Some(name)
            }
            Err(e) => {
                warn!(track = %track.label(), kind = %kind, error = %e, "document render failed");
                None
            }
        };
        let slot: &mut TrackDocuments = match track {
            Track::Customer => &mut documents.customer,
            Track::Partner => &mut documents.partner,
        };
        match kind {
            DocumentKind::Dossier => slot.dossier = name,
            DocumentKind::Summary => slot.summary = name,
        }
    }
    documents
}

// ── Markdown ─────────────────────────────────────────────────────────────────

/// Writes Markdown documents into a directory.
pub struct MarkdownRenderer {
    dir: PathBuf,
    product: String,
    timestamp: Option<NaiveDateTime>,
}

impl MarkdownRenderer {
    pub fn new(dir: impl Into<PathBuf>, product: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            product: product.into(),
            timestamp: None,
        }
    }

    /// Pin the filename timestamp so all four documents of a run line up.
    /// Unpinned renderers stamp each document with the local time.
    pub fn with_timestamp(mut self, at: NaiveDateTime) -> Self {
        self.timestamp = Some(at);
        self
    }

    fn stamp(&self) -> NaiveDateTime {
        self.timestamp
            .unwrap_or_else(|| chrono::Local::now().naive_local())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(
        &self,
        report: &WarRoomReport,
        track: Track,
        kind: DocumentKind,
        at: NaiveDateTime,
        body: String,
    ) -> Result<String, RenderError> {
        let target = Target {
            domain: report.domain.clone(),
            name: report.company_name.clone(),
        };
        let name = artifact_filename(&self.product, &target, track, kind, at, "md");
        let path = self.dir.join(&name);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| RenderError::Io {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| RenderError::Io { path, source })?;
        Ok(name)
    }
}

#[async_trait]
impl DocumentRenderer for MarkdownRenderer {
    async fn render_dossier(&self, report: &WarRoomReport, track: Track) -> Result<String, RenderError> {
        let at = self.stamp();
        let body = dossier_markdown(&self.product, report, track, at);
        self.write(report, track, DocumentKind::Dossier, at, body).await
    }

    async fn render_summary(&self, report: &WarRoomReport, track: Track) -> Result<String, RenderError> {
        let at = self.stamp();
        let body = summary_markdown(&self.product, report, track, at);
        self.write(report, track, DocumentKind::Summary, at, body).await
    }
}

fn other(track: Track) -> Track {
    match track {
        Track::Customer => Track::Partner,
        Track::Partner => Track::Customer,
    }
}

fn title_case(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    }
}

fn or_na<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn out_of_100(v: Option<u8>) -> String {
    v.map(|v| format!("{v}/100")).unwrap_or_else(|| "N/A".to_string())
}

fn regret(summary: &TrackSummary) -> Option<u8> {
    summary.regret_score.as_ref().and_then(|r| r.score)
}

fn bullets(out: &mut String, items: impl IntoIterator<Item = String>) {
    let mut any = false;
    for item in items {
        let _ = writeln!(out, "- {item}");
        any = true;
    }
    if !any {
        let _ = writeln!(out, "_None recorded._");
    }
    out.push('\n');
}

/// One `### <Section> <suffix>` block per non-empty situational section.
fn situation(out: &mut String, suffix: &str, findings: &Situation) {
    for (heading, items) in findings.sections() {
        let _ = writeln!(out, "### {heading} {suffix}\n");
        bullets(
            out,
            items.iter().map(|o| {
                let mut line = format!("**{}**", o.observation);
                if let Some(implication) = &o.implication {
                    let _ = write!(line, ": {implication}");
                }
                if let Some(fit) = &o.client_fit {
                    let _ = write!(line, " (client fit: {fit})");
                }
                line + &source_suffix(&o.source)
            }),
        );
    }
}

fn source_suffix(source: &Option<String>) -> String {
    source
        .as_deref()
        .map(|s| format!(" ([source]({s}))"))
        .unwrap_or_default()
}

pub fn dossier_markdown(product: &str, report: &WarRoomReport, track: Track, at: NaiveDateTime) -> String {
    let label = title_case(track.label());
    let summary = report.track(track);
    let advocate = AdvocateCase::from_result(&report.agent_outputs.bull);
    let skeptic = SkepticCase::from_result(&report.agent_outputs.bear);
    let audit = AuditReport::from_result(&report.agent_outputs.detective);
    let decision = DecisionReport::from_result(&report.agent_outputs.orchestrator);
    let track_decision = decision.track(track);

    let mut out = String::new();
    let _ = writeln!(out, "# {product}: {} {label} Intelligence Dossier\n", report.company_name);
    let _ = writeln!(out, "**Domain:** {}  ", report.domain);
    let _ = writeln!(out, "**Generated:** {}  ", at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "**{label} verdict:** {}  ", or_na(summary.verdict));
    let _ = writeln!(out, "**Confidence:** {}  ", out_of_100(summary.confidence));
    let _ = writeln!(out, "**Regret score:** {}  ", out_of_100(regret(summary)));
    let _ = writeln!(out, "**Recommended approach:** {}\n", report.recommended_approach);

    let _ = writeln!(out, "## 1. Executive Summary\n");
    let _ = writeln!(
        out,
        "{}\n",
        report.executive_summary.as_deref().unwrap_or("No summary provided.")
    );
    if let Some(reason) = summary.regret_score.as_ref().and_then(|r| r.reason.as_deref()) {
        let _ = writeln!(out, "> Why now: {reason}\n");
    }

    let _ = writeln!(out, "## 2. Client Position Analysis\n");
    let _ = writeln!(out, "### Advantages Our Client Holds\n");
    bullets(&mut out, report.client_advantages.iter().cloned());
    let _ = writeln!(out, "### Disadvantages & Obstacles\n");
    bullets(&mut out, report.client_disadvantages.iter().cloned());

    let _ = writeln!(out, "## 3. Key Deciding Factors\n");
    if let Some(f) = track_decision.and_then(|d| d.deciding_factors.as_ref()) {
        let _ = writeln!(out, "- **Key swing factor:** {}", or_na(f.key_swing_factor.as_deref()));
        let _ = writeln!(out, "- **Strongest signal FOR:** {}", or_na(f.strongest_bull_signal.as_deref()));
        let _ = writeln!(out, "- **Strongest signal AGAINST:** {}", or_na(f.strongest_bear_signal.as_deref()));
        let _ = writeln!(out, "- **Detective impact:** {}", or_na(f.detective_impact.as_deref()));
    } else {
        let _ = writeln!(out, "_No deciding factors recorded for this track._");
    }
    if let Some(reason) = &report.recommended_approach_reason {
        let _ = writeln!(out, "- **Recommended approach:** {} ({reason})", report.recommended_approach);
    }
    out.push('\n');

    let _ = writeln!(out, "## 4. Bull Agent Findings: The Case FOR {label} Pursuit\n");
    let _ = writeln!(out, "**Bull score:** {}\n", out_of_100(advocate.score.for_track(track)));
    if let Some(arg) = advocate.key_argument.get(track) {
        let _ = writeln!(out, "> {arg}\n");
    }
    bullets(
        &mut out,
        advocate.signals_for(track).map(|s| {
            format!(
                "**[{}]** {}{}{}",
                or_na(s.strength.as_deref()),
                s.signal,
                s.reasoning.as_deref().map(|r| format!(": {r}")).unwrap_or_default(),
                source_suffix(&s.source)
            )
        }),
    );

    let context: Vec<String> = advocate
        .signals_for(other(track))
        .filter(|s| !s.track.applies_to(track))
        .map(|s| s.signal.clone())
        .collect();
    if !context.is_empty() {
        let _ = writeln!(out, "_{} track signals, for context:_\n", title_case(other(track).label()));
        bullets(&mut out, context);
    }
    situation(&mut out, "Opportunities", &advocate.opportunities);

    let _ = writeln!(out, "## 5. Bear Agent Findings: The Case AGAINST {label} Pursuit\n");
    let _ = writeln!(out, "**Bear score:** {}\n", out_of_100(skeptic.score.for_track(track)));
    if let Some(killer) = skeptic.deal_killer.get(track) {
        let _ = writeln!(out, "**Deal killer:** {killer}\n");
    }
    bullets(
        &mut out,
        skeptic.red_flags_for(track).map(|f| {
            format!(
                "**[{}]** {}{}{}",
                or_na(f.severity.as_deref()),
                f.flag,
                f.impact.as_deref().map(|i| format!(": {i}")).unwrap_or_default(),
                source_suffix(&f.source)
            )
        }),
    );
    if let Some(risk) = &skeptic.competitor_risk {
        let _ = writeln!(
            out,
            "**Competitor risk:** {} (threat {})\n",
            or_na(risk.competitor_name.as_deref()),
            or_na(risk.threat_level.as_deref())
        );
    }
    situation(&mut out, "Barriers", &skeptic.barriers);

    let _ = writeln!(out, "## 6. Detective Agent Audit: Evidence Quality Review\n");
    let _ = writeln!(out, "### Evidence Quality Scores\n");
    for t in Track::BOTH {
        let _ = writeln!(out, "- {}: {}", title_case(t.label()), out_of_100(audit.evidence_score(t)));
    }
    out.push('\n');
    if let Some(split) = &audit.split_verdict {
        let _ = writeln!(out, "### Split Verdict Assessment\n");
        for t in Track::BOTH {
            let _ = writeln!(
                out,
                "- {} track strength: {}",
                title_case(t.label()),
                or_na((*split.strength.get(t)).map(|s| s.as_str()))
            );
        }
        if let Some(reasoning) = &split.reasoning {
            let _ = writeln!(out, "- Reasoning: {reasoning}");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "### Critical Overlooked Fact\n");
    let _ = writeln!(
        out,
        "{}\n",
        audit.critical_overlooked_fact.as_deref().unwrap_or("None identified.")
    );
    let _ = writeln!(out, "### Missing Context Found\n");
    bullets(
        &mut out,
        audit
            .missing_context
            .iter()
            .filter(|m| m.track.applies_to(track))
            .map(|m| {
                format!(
                    "{} [{}]{}",
                    m.finding,
                    or_na(m.impact.map(|i| i.as_str())),
                    m.explanation.as_deref().map(|e| format!(": {e}")).unwrap_or_default()
                )
            }),
    );

    let _ = writeln!(out, "## 7. {label} Track Outreach Strategy\n");
    let _ = writeln!(out, "### Target Decision Maker\n");
    match &summary.target_decision_maker {
        Some(dm) => {
            let _ = writeln!(out, "- **Title:** {}", or_na(dm.title.as_deref()));
            let _ = writeln!(out, "- **Why:** {}", or_na(dm.why.as_deref()));
            let _ = writeln!(out, "- **LinkedIn search:** {}\n", or_na(dm.linkedin_search_tip.as_deref()));
        }
        None => {
            let _ = writeln!(out, "_Not identified._\n");
        }
    }
    let _ = writeln!(out, "### Outreach Email Draft\n");
    match &summary.outreach_email {
        Some(email) => {
            let _ = writeln!(out, "**Subject:** {}\n", or_na(email.subject.as_deref()));
            let _ = writeln!(out, "{}\n", email.body.as_deref().unwrap_or(""));
        }
        None => {
            let _ = writeln!(out, "_No outreach drafted for this track._\n");
        }
    }
    let _ = writeln!(out, "### Proposed Next Steps\n");
    bullets(&mut out, report.next_steps.iter().cloned());
    if let Some(trigger) = &summary.if_hold {
        let _ = writeln!(out, "### Re-evaluation Trigger\n\n{trigger}\n");
    }
    if let Some(revisit) = &summary.if_avoid {
        let _ = writeln!(out, "### Conditions to Revisit\n\n{revisit}\n");
    }

    let _ = writeln!(out, "---\n_Generated autonomously by {product}. Confidential, internal sales use only._");
    out
}

pub fn summary_markdown(product: &str, report: &WarRoomReport, track: Track, at: NaiveDateTime) -> String {
    let label = title_case(track.label());
    let other_label = title_case(other(track).label());
    let this = report.track(track);
    let that = report.track(other(track));

    let mut out = String::new();
    let _ = writeln!(out, "# {product}: {} {label} Executive Summary\n", report.company_name);
    let _ = writeln!(out, "## Executive Summary\n");
    let _ = writeln!(
        out,
        "{}\n",
        report.executive_summary.as_deref().unwrap_or("No summary provided.")
    );
    let _ = writeln!(out, "## {label} Track: Key Metrics\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|--------|-------|");
    for (name, s) in [(label.as_str(), this), (other_label.as_str(), that)] {
        let _ = writeln!(out, "| {name} Verdict | {} |", or_na(s.verdict));
        let _ = writeln!(out, "| {name} Confidence | {} |", out_of_100(s.confidence));
        let _ = writeln!(out, "| {name} Regret | {} |", out_of_100(regret(s)));
    }
    let _ = writeln!(out, "| Recommended Approach | {} |\n", report.recommended_approach);
    let _ = writeln!(
        out,
        "---\n_Generated autonomously by {product} on {}. All intelligence was gathered from public sources via live web search._",
        at.format("%Y-%m-%d")
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use deliberation::{assemble, parse_stage_output, AgentRole, ContractPolicy, StageOutputs};
    use serde_json::json;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    fn report() -> WarRoomReport {
        let stage = |role, v: serde_json::Value| {
            parse_stage_output(role, &v.to_string(), &ContractPolicy::default()).unwrap()
        };
        assemble(
            &Target::parse("acme-corp.io").unwrap(),
            StageOutputs {
                advocate: stage(AgentRole::Advocate, json!({
                    "agentRole": "BULL", "companyName": "Acme Corp",
                    "overallBullScore": {"customerScore": 80, "partnerScore": 55},
                    "customerSignals": [{"signal": "Raised $40M Series B", "strength": "HIGH", "source": "https://news.example/b"}],
                    "technicalDebtSignals": [{"observation": "Monolith deploys weekly", "howClientHelps": "Incremental CI"}]
                })),
                skeptic: stage(AgentRole::Skeptic, json!({
                    "agentRole": "BEAR", "companyName": "Acme Corp",
                    "overallBearScore": {"customerScore": 20, "partnerScore": 50},
                    "fiscalPressureBarriers": [{"observation": "Vendor freeze until Q4", "source": "https://news.example/f", "budgetRisk": "No new spend"}]
                })),
                auditor: stage(AgentRole::Auditor, json!({
                    "agentRole": "DETECTIVE", "companyName": "Acme Corp",
                    "customerTrackAudit": {"evidenceScore": 70},
                    "partnerTrackAudit": {"evidenceScore": 60},
                    "criticalOverlookedFact": "New CTO from a rival"
                })),
                decision: stage(AgentRole::Decision, json!({
                    "agentRole": "ORCHESTRATOR", "companyName": "Acme Corp",
                    "executiveSummary": "Strong buyer, weak partner.",
                    "regretScore": {"score": 70, "reason": "Budget lands this quarter"},
                    "customerTrack": {"verdict": "PURSUE", "confidence": 75,
                                      "outreachEmail": {"subject": "Your Series B", "body": "Hi Dana"}},
                    "partnerTrack": {"verdict": "HOLD", "confidence": 40,
                                     "ifHold": "Revisit after their API launch"}
                })),
            },
        )
    }

    #[test]
    fn dossier_sections_follow_track() {
        let md = dossier_markdown("ALLYVEX", &report(), Track::Customer, at());
        assert!(md.starts_with("# ALLYVEX: Acme Corp Customer Intelligence Dossier"));
        assert!(md.contains("**Customer verdict:** PURSUE"));
        assert!(md.contains("Raised $40M Series B"));
        assert!(md.contains("**Subject:** Your Series B"));
        assert!(md.contains("New CTO from a rival"));
        assert!(!md.contains("Re-evaluation Trigger"));
        assert!(md.contains(
            "### Technical Debt Opportunities\n\n- **Monolith deploys weekly**: Incremental CI\n"
        ));
        assert!(md.contains(
            "### Fiscal Pressure Barriers\n\n- **Vendor freeze until Q4**: No new spend ([source](https://news.example/f))\n"
        ));
        assert!(!md.contains("Recent Pivots"));

        let partner = dossier_markdown("ALLYVEX", &report(), Track::Partner, at());
        assert!(partner.contains("### Re-evaluation Trigger\n\nRevisit after their API launch"));
        assert!(partner.contains("_Customer track signals, for context:_\n\n- Raised $40M Series B"));
        assert!(!md.contains("for context"));
    }

    #[test]
    fn summary_lists_both_tracks() {
        let md = summary_markdown("ALLYVEX", &report(), Track::Partner, at());
        assert!(md.contains("| Partner Verdict | HOLD |"));
        assert!(md.contains("| Customer Verdict | PURSUE |"));
        assert!(md.contains("| Customer Confidence | 75/100 |"));
        assert!(md.contains("| Recommended Approach | CUSTOMER_NOW_PARTNER_LATER |"));
    }

    #[tokio::test]
    async fn markdown_renderer_writes_all_four() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = MarkdownRenderer::new(dir.path().join("out"), "ALLYVEX").with_timestamp(at());
        let docs = render_all(&renderer, &report()).await;
        assert_eq!(
            docs.partner.summary.as_deref(),
            Some("ALLYVEX_Acme_Corp_PARTNER_ExecutiveSummary_20260309_140507.md")
        );
        for name in [&docs.customer.dossier, &docs.customer.summary, &docs.partner.dossier, &docs.partner.summary] {
            let name = name.as_deref().expect("rendered");
            assert!(dir.path().join("out").join(name).is_file());
        }
    }

    #[tokio::test]
    async fn unwritable_directory_yields_null_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a dir").unwrap();
        let renderer = MarkdownRenderer::new(&blocker, "ALLYVEX");
        let docs = render_all(&renderer, &report()).await;
        assert_eq!(docs, DocumentSet::default());
    }
}
