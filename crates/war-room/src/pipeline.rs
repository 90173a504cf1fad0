//! Pipeline controller: a suspendable producer of [`PipelineEvent`]s.
//!
//! ```text
//!   start(domain, profile) ──► WarRoomRun
//!        │ validation errors here; no event emitted
//!        ▼
//!   next_event():  BULL_START, BULL_DONE, BEAR_START, ... ORCHESTRATOR_DONE
//!                  then render (best-effort) and COMPLETE
//!                  or, on the first stage error, a single ERROR
//! ```
//!
//! Each call to [`WarRoomRun::next_event`] does at most one stage of work,
//! so a consumer that stops pulling stops the run. Cancelling the run's
//! token has the same effect from outside, including mid-stage.

use std::path::PathBuf;
use std::sync::Arc;

use deliberation::target::validate_client_profile;
use deliberation::{
    assemble, AgentRole, InputValidationError, Phase, PipelineEvent, PipelineState,
    PipelineStateMachine, StageError, StageOutputs, StageResult, Target,
};
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::prompts::Upstream;
use crate::render::{render_all, DocumentRenderer};
use crate::stages::{StageContext, StageSet};
use crate::telemetry::{append_metrics, RunCollector, StageOutcome};

/// Long-lived wiring: the four stages and the renderer. Cheap to clone.
#[derive(Clone)]
pub struct WarRoom {
    stages: StageSet,
    renderer: Arc<dyn DocumentRenderer>,
    metrics_path: Option<PathBuf>,
}

impl WarRoom {
    pub fn new(stages: StageSet, renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self {
            stages,
            renderer,
            metrics_path: None,
        }
    }

    /// Append one JSON line of run metrics per finished run.
    pub fn with_metrics_path(mut self, path: Option<PathBuf>) -> Self {
        self.metrics_path = path;
        self
    }

    /// Validate the inputs and prepare a run. Nothing executes until the
    /// first [`WarRoomRun::next_event`].
    pub fn start(&self, domain: &str, client_profile: &str) -> Result<WarRoomRun, InputValidationError> {
        let target = Target::parse(domain)?;
        let profile = validate_client_profile(client_profile)?;
        info!(company = %target.name, domain = %target.domain, "war room run prepared");
        Ok(WarRoomRun {
            collector: Some(RunCollector::new(&target.name, &target.domain)),
            ctx: StageContext::new(target, profile),
            stages: self.stages.clone(),
            renderer: Arc::clone(&self.renderer),
            metrics_path: self.metrics_path.clone(),
            machine: PipelineStateMachine::new(),
            step: Step::Start(AgentRole::Advocate),
            results: Results::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start(AgentRole),
    Run(AgentRole),
    Finish,
    Done,
}

#[derive(Default)]
struct Results {
    advocate: Option<StageResult>,
    skeptic: Option<StageResult>,
    auditor: Option<StageResult>,
    decision: Option<StageResult>,
}

impl Results {
    fn upstream(&self) -> Upstream<'_> {
        Upstream {
            advocate: self.advocate.as_ref(),
            skeptic: self.skeptic.as_ref(),
            auditor: self.auditor.as_ref(),
        }
    }

    fn store(&mut self, result: StageResult) {
        let slot = match result.role() {
            AgentRole::Advocate => &mut self.advocate,
            AgentRole::Skeptic => &mut self.skeptic,
            AgentRole::Auditor => &mut self.auditor,
            AgentRole::Decision => &mut self.decision,
        };
        *slot = Some(result);
    }

    fn take_all(&mut self) -> Option<StageOutputs> {
        Some(StageOutputs {
            advocate: self.advocate.take()?,
            skeptic: self.skeptic.take()?,
            auditor: self.auditor.take()?,
            decision: self.decision.take()?,
        })
    }
}

/// One run in flight. Owns its results and event sequence; nothing is
/// shared with other runs.
pub struct WarRoomRun {
    ctx: StageContext,
    stages: StageSet,
    renderer: Arc<dyn DocumentRenderer>,
    metrics_path: Option<PathBuf>,
    machine: PipelineStateMachine,
    step: Step,
    results: Results,
    collector: Option<RunCollector>,
}

impl WarRoomRun {
    pub fn target(&self) -> &Target {
        &self.ctx.target
    }

    /// Token that aborts the run at the next suspension point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.ctx.cancel.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.machine.current()
    }

    /// Produce the next event, or `None` once the run is over (after the
    /// terminal event, or when cancelled).
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        if self.step != Step::Done && self.ctx.is_cancelled() {
            self.abandon();
            return None;
        }
        match self.step {
            Step::Done => None,
            Step::Start(role) => {
                self.transition(PipelineState::for_role(role), None);
                if let Some(c) = self.collector.as_mut() {
                    c.start_stage(role);
                }
                self.step = Step::Run(role);
                Some(PipelineEvent::started(role, &self.ctx.target))
            }
            Step::Run(role) => self.run_stage(role).await,
            Step::Finish => Some(self.finish().await),
        }
    }

    async fn run_stage(&mut self, role: AgentRole) -> Option<PipelineEvent> {
        let stage = Arc::clone(self.stages.get(role));
        let outcome = tokio::select! {
            res = stage.run(&self.ctx, self.results.upstream()) => Some(res),
            _ = self.ctx.cancel.cancelled() => None,
        };
        let Some(outcome) = outcome else {
            self.abandon();
            return None;
        };

        match outcome {
            Ok(result) if result.role() == role => {
                if let Some(c) = self.collector.as_mut() {
                    c.finish_stage(StageOutcome::Ok);
                }
                self.step = role.next().map_or(Step::Finish, Step::Start);
                self.results.store(result.clone());
                Some(PipelineEvent::completed(result))
            }
            Ok(result) => Some(self.fail(StageError::malformed(
                role,
                format!("stage produced a {} result", result.role()),
            ))),
            Err(error) => Some(self.fail(error)),
        }
    }

    fn fail(&mut self, error: StageError) -> PipelineEvent {
        warn!(
            stage = %error.stage(),
            code = error.code(),
            company = %self.ctx.target.name,
            error = %error,
            "war room run failed"
        );
        if let Some(c) = self.collector.as_mut() {
            c.finish_stage(match error {
                StageError::MalformedOutput { .. } => StageOutcome::Malformed,
                StageError::BackendUnavailable { .. } => StageOutcome::Unavailable,
            });
        }
        if let Err(e) = self.machine.fail(&error.to_string()) {
            warn!(error = %e, "state machine rejected failure transition");
        }
        self.conclude(Some(Phase::Error));
        PipelineEvent::Failed { error }
    }

    async fn finish(&mut self) -> PipelineEvent {
        let Some(outputs) = self.results.take_all() else {
            return self.fail(StageError::malformed(
                AgentRole::Decision,
                "run finished without all four stage results",
            ));
        };
        self.transition(PipelineState::Render, None);

        let mut report = assemble(&self.ctx.target, outputs);
        let documents = render_all(self.renderer.as_ref(), &report).await;
        if let Some(c) = self.collector.as_mut() {
            c.record_documents(&documents);
        }
        report.attach_documents(documents);

        self.transition(PipelineState::Complete, None);
        info!(
            company = %report.company_name,
            customer = ?report.customer_track.verdict,
            partner = ?report.partner_track.verdict,
            approach = %report.recommended_approach,
            path = %self.machine.summary(),
            "war room complete"
        );
        self.conclude(Some(Phase::Complete));
        PipelineEvent::complete(report)
    }

    fn abandon(&mut self) {
        info!(company = %self.ctx.target.name, state = %self.machine.current(), "war room run cancelled");
        self.conclude(None);
    }

    fn conclude(&mut self, terminal: Option<Phase>) {
        self.step = Step::Done;
        if let Some(collector) = self.collector.take() {
            let metrics = collector.finalize(terminal);
            metrics.emit();
            if let Some(path) = &self.metrics_path {
                append_metrics(&metrics, path);
            }
        }
    }

    fn transition(&mut self, to: PipelineState, reason: Option<&str>) {
        if let Err(e) = self.machine.advance(to, reason) {
            warn!(error = %e, "illegal pipeline transition");
        }
    }

    /// Drive the run to its end and return every event.
    pub async fn collect_events(mut self) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    pub fn into_stream(self) -> impl Stream<Item = PipelineEvent> + Send {
        futures::stream::unfold(self, |mut run| async move {
            run.next_event().await.map(|event| (event, run))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;
    use crate::stages::ReasoningStage;
    use async_trait::async_trait;
    use deliberation::{parse_stage_output, ContractPolicy, Track, WarRoomReport};
    use serde_json::json;

    struct Canned(AgentRole, serde_json::Value);

    #[async_trait]
    impl ReasoningStage for Canned {
        fn role(&self) -> AgentRole {
            self.0
        }

        async fn run(&self, _ctx: &StageContext, _upstream: Upstream<'_>) -> Result<StageResult, StageError> {
            parse_stage_output(self.0, &self.1.to_string(), &ContractPolicy::default())
        }
    }

    struct NoDocs;

    #[async_trait]
    impl DocumentRenderer for NoDocs {
        async fn render_dossier(&self, _: &WarRoomReport, _: Track) -> Result<String, RenderError> {
            Err(RenderError::Failed("disabled".into()))
        }
        async fn render_summary(&self, _: &WarRoomReport, _: Track) -> Result<String, RenderError> {
            Err(RenderError::Failed("disabled".into()))
        }
    }

    fn war_room() -> WarRoom {
        let stage = |role, v| Arc::new(Canned(role, v)) as Arc<dyn ReasoningStage>;
        WarRoom::new(
            StageSet {
                advocate: stage(
                    AgentRole::Advocate,
                    json!({"agentRole": "BULL", "companyName": "Acme Corp", "overallBullScore": 80}),
                ),
                skeptic: stage(
                    AgentRole::Skeptic,
                    json!({"agentRole": "BEAR", "companyName": "Acme Corp", "overallBearScore": 20}),
                ),
                auditor: stage(
                    AgentRole::Auditor,
                    json!({"agentRole": "DETECTIVE", "companyName": "Acme Corp", "bullAudit": {"evidenceScore": 70}}),
                ),
                decision: stage(
                    AgentRole::Decision,
                    json!({
                        "agentRole": "ORCHESTRATOR", "companyName": "Acme Corp",
                        "verdict": "PURSUE", "confidence": 70, "regretScore": 60,
                        "outreachEmail": {"subject": "Hello", "body": "Quick intro"}
                    }),
                ),
            },
            Arc::new(NoDocs),
        )
    }

    #[test]
    fn invalid_inputs_rejected_before_any_event() {
        assert!(war_room().start("", "profile").is_err());
        assert!(war_room().start("acme.io", "   ").is_err());
    }

    #[tokio::test]
    async fn state_machine_follows_events() {
        let mut run = war_room().start("https://www.Acme-Corp.io/", "We sell CI.").unwrap();
        assert_eq!(run.target().name, "Acme Corp");
        assert_eq!(run.state(), PipelineState::Init);

        let first = run.next_event().await.unwrap();
        assert_eq!(first.phase(), Phase::BullStart);
        assert_eq!(run.state(), PipelineState::Advocate);

        let mut last = first;
        while let Some(event) = run.next_event().await {
            last = event;
        }
        assert_eq!(last.phase(), Phase::Complete);
        assert_eq!(run.state(), PipelineState::Complete);
        assert!(run.next_event().await.is_none());
    }

    #[tokio::test]
    async fn cancelled_run_stops_without_terminal_event() {
        let mut run = war_room().start("acme-corp.io", "We sell CI.").unwrap();
        assert!(run.next_event().await.is_some());
        run.cancel_token().cancel();
        assert!(run.next_event().await.is_none());
        assert!(run.next_event().await.is_none());
    }

    #[tokio::test]
    async fn render_failures_still_complete() {
        let events = war_room()
            .start("acme-corp.io", "We sell CI.")
            .unwrap()
            .collect_events()
            .await;
        assert_eq!(events.len(), 9);
        match events.last() {
            Some(PipelineEvent::Complete { result, .. }) => {
                assert_eq!(result.documents, deliberation::DocumentSet::default());
            }
            other => panic!("expected COMPLETE, got {other:?}"),
        }
    }
}
