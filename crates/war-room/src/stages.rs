//! Role-parameterized reasoning stages.
//!
//! ```text
//!   queries ──► evidence provider ──► rendered search text ─┐
//!   upstream results (pretty JSON) ─────────────────────────┼─► backend ──► parse_stage_output
//!   client profile ──► system prompt ───────────────────────┘
//! ```
//!
//! | Role     | Evidence queries                                   |
//! |----------|----------------------------------------------------|
//! | Advocate | funding, hiring / launches, technology             |
//! | Skeptic  | distress, competitor lock-in, pivots               |
//! | Auditor  | exactly one gap query chosen from upstream results |
//! | Decision | none, and no provider attached                     |

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use deliberation::schema::{AdvocateCase, SkepticCase};
use deliberation::{parse_stage_output, AgentRole, ContractPolicy, StageError, StageResult, Target};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendSet, CompletionRequest, ReasoningBackend};
use crate::config::{RoleConfig, WarRoomConfig};
use crate::evidence::{multi_search, web_search, EvidenceProvider, SharedEvidence};
use crate::prompts::{self, Upstream};

/// Shared per-run context handed to every stage.
///
/// Cheap to clone: shared fields sit behind `Arc` and the token is a handle.
#[derive(Clone)]
pub struct StageContext {
    pub target: Arc<Target>,
    pub client_profile: Arc<str>,
    /// Checked by the controller between stages.
    pub cancel: CancellationToken,
}

impl StageContext {
    pub fn new(target: Target, client_profile: impl Into<Arc<str>>) -> Self {
        Self {
            target: Arc::new(target),
            client_profile: client_profile.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[async_trait]
pub trait ReasoningStage: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Produce one validated result, or the single error that ends the run.
    async fn run(&self, ctx: &StageContext, upstream: Upstream<'_>) -> Result<StageResult, StageError>;
}

// ── Queries ──────────────────────────────────────────────────────────────────

pub fn evidence_queries(role: AgentRole, name: &str, upstream: &Upstream<'_>) -> Vec<String> {
    match role {
        AgentRole::Advocate => vec![
            format!("{name} funding round investment 2025"),
            format!("{name} hiring expansion product launch"),
            format!("{name} technology stack infrastructure engineering"),
        ],
        AgentRole::Skeptic => vec![
            format!("{name} layoffs budget cuts problems 2025"),
            format!("{name} competitor contract vendor partnership"),
            format!("{name} financial distress pivot strategy change"),
        ],
        AgentRole::Auditor => vec![gap_query(name, upstream.advocate, upstream.skeptic)],
        AgentRole::Decision => Vec::new(),
    }
}

/// The auditor's single query, aimed at the biggest hole in the debate.
///
/// Priority: unknown competitor picture, then unverified upside, then
/// general recency.
pub fn gap_query(
    name: &str,
    advocate: Option<&StageResult>,
    skeptic: Option<&StageResult>,
) -> String {
    let competitor_unknown = skeptic
        .map(|s| SkepticCase::from_result(s).competitor_threat_unknown())
        .unwrap_or(true);
    if competitor_unknown {
        return format!("{name} competitor vendor contract lock-in");
    }
    let strong_upside = advocate
        .map(|a| AdvocateCase::from_result(a).has_high_strength_signal())
        .unwrap_or(false);
    if !strong_upside {
        return format!("{name} funding round confirmed investors");
    }
    format!("{name} latest news 2025")
}

// ── RoleStage ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// A reasoning stage bound to one role, one backend and (optionally) an
/// evidence provider.
pub struct RoleStage {
    role: AgentRole,
    config: RoleConfig,
    backend: Arc<dyn ReasoningBackend>,
    evidence: Option<SharedEvidence>,
    results_per_query: usize,
    product: String,
    policy: ContractPolicy,
    retry: RetryPolicy,
}

impl RoleStage {
    pub fn new(role: AgentRole, config: RoleConfig, backend: Arc<dyn ReasoningBackend>) -> Self {
        Self {
            role,
            config,
            backend,
            evidence: None,
            results_per_query: 2,
            product: "ALLYVEX".to_string(),
            policy: ContractPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Attach a search provider. Ignored for the decision role, which
    /// reasons over upstream results only.
    pub fn with_evidence(mut self, provider: SharedEvidence, results_per_query: usize) -> Self {
        if self.role != AgentRole::Decision {
            self.evidence = Some(provider);
            self.results_per_query = results_per_query;
        }
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_policy(mut self, policy: ContractPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_evidence(&self) -> bool {
        self.evidence.is_some()
    }

    async fn gather(&self, provider: &dyn EvidenceProvider, queries: &[String]) -> String {
        if let [query] = queries {
            return web_search(provider, query, self.results_per_query).await;
        }
        let bundle = multi_search(provider, queries, self.results_per_query).await;
        info!(
            stage = %self.role,
            queries = queries.len(),
            snippets = bundle.snippet_count(),
            degradation = ?bundle.degradation(),
            "evidence gathered"
        );
        bundle.render()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, StageError> {
        let mut attempt = 1u32;
        loop {
            let started = Instant::now();
            match self.backend.complete(request).await {
                Ok(text) => {
                    debug!(
                        stage = %self.role,
                        model = %request.model,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        chars = text.len(),
                        "backend call ok"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retriable() && attempt < self.retry.max_attempts => {
                    warn!(stage = %self.role, attempt, error = %e, "backend call failed, retrying");
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(stage = %self.role, attempt, error = %e, "backend call failed");
                    return Err(StageError::unavailable(self.role, e.kind, e.message));
                }
            }
        }
    }
}

#[async_trait]
impl ReasoningStage for RoleStage {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn run(&self, ctx: &StageContext, upstream: Upstream<'_>) -> Result<StageResult, StageError> {
        let started = Instant::now();
        let target = ctx.target.as_ref();

        let evidence = match &self.evidence {
            Some(provider) => {
                let queries = evidence_queries(self.role, &target.name, &upstream);
                if queries.is_empty() {
                    None
                } else {
                    Some(self.gather(provider.as_ref(), &queries).await)
                }
            }
            None => None,
        };

        let request = CompletionRequest::for_role(
            &self.config,
            prompts::system_prompt(self.role, &self.product, &ctx.client_profile),
            prompts::user_message(self.role, target, evidence.as_deref(), &upstream),
        );
        let raw = self.complete(&request).await?;

        let result = parse_stage_output(self.role, &raw, &self.policy).inspect_err(|e| {
            warn!(stage = %self.role, company = %target.name, error = %e, "stage output rejected");
        })?;
        info!(
            stage = %self.role,
            company = %target.name,
            schema = ?result.schema(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage complete"
        );
        Ok(result)
    }
}

// ── StageSet ─────────────────────────────────────────────────────────────────

/// The four stages of one pipeline, in order.
#[derive(Clone)]
pub struct StageSet {
    pub advocate: Arc<dyn ReasoningStage>,
    pub skeptic: Arc<dyn ReasoningStage>,
    pub auditor: Arc<dyn ReasoningStage>,
    pub decision: Arc<dyn ReasoningStage>,
}

impl StageSet {
    pub fn get(&self, role: AgentRole) -> &Arc<dyn ReasoningStage> {
        match role {
            AgentRole::Advocate => &self.advocate,
            AgentRole::Skeptic => &self.skeptic,
            AgentRole::Auditor => &self.auditor,
            AgentRole::Decision => &self.decision,
        }
    }

    /// Wire every role to its configured backend; evidence goes to every
    /// role except the decision maker.
    pub fn from_config(
        config: &WarRoomConfig,
        backends: &BackendSet,
        evidence: SharedEvidence,
    ) -> AnyResult<Self> {
        let retry = RetryPolicy {
            max_attempts: config.pipeline.max_attempts,
            backoff: Duration::from_millis(config.pipeline.retry_backoff_ms),
        };
        let policy = ContractPolicy {
            strict_approach: config.pipeline.strict_approach,
        };
        let build = |role: AgentRole| -> AnyResult<Arc<dyn ReasoningStage>> {
            let rc = config.roles.get(role);
            let backend = backends
                .get(rc.provider)
                .with_context(|| format!("no backend for provider {} ({role})", rc.provider))?;
            Ok(Arc::new(
                RoleStage::new(role, rc.clone(), backend)
                    .with_evidence(evidence.clone(), config.search.results_per_query)
                    .with_product(config.output.product.trim())
                    .with_policy(policy)
                    .with_retry(retry),
            ))
        };
        Ok(Self {
            advocate: build(AgentRole::Advocate)?,
            skeptic: build(AgentRole::Skeptic)?,
            auditor: build(AgentRole::Auditor)?,
            decision: build(AgentRole::Decision)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockReasoningBackend};
    use crate::evidence::{MockEvidenceProvider, Snippet};
    use deliberation::FailureKind;
    use serde_json::json;

    fn ctx() -> StageContext {
        StageContext::new(Target::parse("acme-corp.io").unwrap(), "We sell CI tooling.")
    }

    #[test]
    fn cloned_context_shares_cancellation() {
        let ctx = ctx();
        let token = ctx.cancel.clone();
        let copy = ctx.clone();
        assert!(!copy.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(copy.is_cancelled());
    }

    fn stage_result(role: AgentRole, v: serde_json::Value) -> StageResult {
        parse_stage_output(role, &v.to_string(), &ContractPolicy::default()).unwrap()
    }

    fn bull(strength: &str) -> StageResult {
        stage_result(
            AgentRole::Advocate,
            json!({"agentRole": "BULL", "companyName": "Acme Corp", "overallBullScore": 70,
                   "topSignals": [{"signal": "Series B", "strength": strength}]}),
        )
    }

    fn bear(threat: Option<&str>) -> StageResult {
        let mut body = json!({"agentRole": "BEAR", "companyName": "Acme Corp", "overallBearScore": 30});
        if let Some(t) = threat {
            body["competitorRisk"] = json!({"hasCompetitorContract": false, "threatLevel": t});
        }
        stage_result(AgentRole::Skeptic, body)
    }

    #[test]
    fn gap_query_prefers_unknown_competitor_picture() {
        assert_eq!(
            gap_query("Acme Corp", Some(&bull("HIGH")), Some(&bear(None))),
            "Acme Corp competitor vendor contract lock-in"
        );
        assert_eq!(
            gap_query("Acme Corp", Some(&bull("HIGH")), Some(&bear(Some("unknown")))),
            "Acme Corp competitor vendor contract lock-in"
        );
    }

    #[test]
    fn gap_query_verifies_weak_upside() {
        assert_eq!(
            gap_query("Acme Corp", Some(&bull("MEDIUM")), Some(&bear(Some("LOW")))),
            "Acme Corp funding round confirmed investors"
        );
    }

    #[test]
    fn gap_query_falls_back_to_recent_news() {
        assert_eq!(
            gap_query("Acme Corp", Some(&bull("HIGH")), Some(&bear(Some("LOW")))),
            "Acme Corp latest news 2025"
        );
    }

    #[test]
    fn query_counts_per_role() {
        let up = Upstream::default();
        assert_eq!(evidence_queries(AgentRole::Advocate, "Acme", &up).len(), 3);
        assert_eq!(evidence_queries(AgentRole::Skeptic, "Acme", &up).len(), 3);
        assert_eq!(evidence_queries(AgentRole::Auditor, "Acme", &up).len(), 1);
        assert!(evidence_queries(AgentRole::Decision, "Acme", &up).is_empty());
        assert_eq!(
            evidence_queries(AgentRole::Skeptic, "Acme", &up)[1],
            "Acme competitor contract vendor partnership"
        );
    }

    #[tokio::test]
    async fn advocate_searches_then_parses() {
        let mut evidence = MockEvidenceProvider::new();
        evidence
            .expect_search()
            .times(3)
            .returning(|q, _| Ok(vec![Snippet::new(q, "https://x.io", "hit")]));
        let mut backend = MockReasoningBackend::new();
        backend
            .expect_complete()
            .withf(|req| req.user.contains("=== Acme Corp funding round investment 2025 ==="))
            .times(1)
            .returning(|_| {
                Ok("```json\n{\"agentRole\":\"BULL\",\"companyName\":\"Acme Corp\",\"overallBullScore\":81}\n```".into())
            });

        let stage = RoleStage::new(AgentRole::Advocate, RoleConfig::default(), Arc::new(backend))
            .with_evidence(Arc::new(evidence), 2);
        let result = stage.run(&ctx(), Upstream::default()).await.unwrap();
        assert_eq!(result.role(), AgentRole::Advocate);
        assert_eq!(result.body()["overallBullScore"], 81);
    }

    #[tokio::test]
    async fn decision_never_searches() {
        let mut evidence = MockEvidenceProvider::new();
        evidence.expect_search().times(0);
        let mut backend = MockReasoningBackend::new();
        backend.expect_complete().times(1).returning(|_| {
            Ok(r#"{"agentRole":"ORCHESTRATOR","companyName":"Acme Corp","verdict":"HOLD","confidence":50,"regretScore":30}"#.into())
        });
        let stage = RoleStage::new(AgentRole::Decision, RoleConfig::default(), Arc::new(backend))
            .with_evidence(Arc::new(evidence), 2);
        assert!(!stage.has_evidence());
        stage.run(&ctx(), Upstream::default()).await.unwrap();
    }

    #[tokio::test]
    async fn retriable_failures_are_retried_within_budget() {
        let mut backend = MockReasoningBackend::new();
        let mut seq = mockall::Sequence::new();
        backend
            .expect_complete()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(BackendError::new(FailureKind::RateLimit, "429")));
        backend
            .expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(r#"{"agentRole":"BEAR","companyName":"Acme","overallBearScore":10}"#.into()));
        let stage = RoleStage::new(AgentRole::Skeptic, RoleConfig::default(), Arc::new(backend))
            .with_retry(RetryPolicy { max_attempts: 3, backoff: Duration::ZERO });
        assert!(stage.run(&ctx(), Upstream::default()).await.is_ok());
    }

    #[tokio::test]
    async fn auth_failures_are_not_retried() {
        let mut backend = MockReasoningBackend::new();
        backend
            .expect_complete()
            .times(1)
            .returning(|_| Err(BackendError::new(FailureKind::Auth, "HTTP 401: bad key")));
        let stage = RoleStage::new(AgentRole::Skeptic, RoleConfig::default(), Arc::new(backend))
            .with_retry(RetryPolicy { max_attempts: 3, backoff: Duration::ZERO });
        let err = stage.run(&ctx(), Upstream::default()).await.unwrap_err();
        assert_eq!(err, StageError::unavailable(AgentRole::Skeptic, FailureKind::Auth, "HTTP 401: bad key"));
    }

    #[tokio::test]
    async fn malformed_output_is_never_retried() {
        let mut backend = MockReasoningBackend::new();
        backend
            .expect_complete()
            .times(1)
            .returning(|_| Ok("I could not find anything about this company.".into()));
        let stage = RoleStage::new(AgentRole::Auditor, RoleConfig::default(), Arc::new(backend))
            .with_retry(RetryPolicy { max_attempts: 5, backoff: Duration::ZERO });
        let err = stage.run(&ctx(), Upstream::default()).await.unwrap_err();
        assert_eq!(err.code(), "MALFORMED_OUTPUT");
        assert_eq!(err.stage(), AgentRole::Auditor);
    }

    #[tokio::test]
    async fn wrong_agent_role_is_malformed() {
        let mut backend = MockReasoningBackend::new();
        backend.expect_complete().returning(|_| {
            Ok(r#"{"agentRole":"BULL","companyName":"Acme","overallBearScore":10}"#.into())
        });
        let stage = RoleStage::new(AgentRole::Skeptic, RoleConfig::default(), Arc::new(backend));
        let err = stage.run(&ctx(), Upstream::default()).await.unwrap_err();
        assert!(matches!(err, StageError::MalformedOutput { stage: AgentRole::Skeptic, .. }));
    }
}
