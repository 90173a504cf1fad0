//! Per-run telemetry.
//!
//! A [`RunCollector`] rides along with the pipeline controller and is
//! finalized into [`RunMetrics`] once the terminal event is produced. Metrics
//! are always logged; when `output.metrics_path` is set they are also
//! appended to that file as one JSON line per run.

use std::path::Path;
use std::time::Instant;

use deliberation::{AgentRole, DocumentSet, Phase};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Ok,
    Malformed,
    Unavailable,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetric {
    pub stage: AgentRole,
    pub elapsed_ms: u64,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: Uuid,
    pub company: String,
    pub domain: String,
    pub stages: Vec<StageMetric>,
    pub documents_rendered: u32,
    pub render_failures: u32,
    /// `COMPLETE`, `ERROR`, or `CANCELLED` when the consumer stopped early.
    pub terminal_phase: String,
    pub elapsed_ms: u64,
    pub timestamp: String,
}

impl RunMetrics {
    pub fn emit(&self) {
        info!(
            run_id = %self.run_id,
            company = %self.company,
            stages = self.stages.len(),
            documents_rendered = self.documents_rendered,
            render_failures = self.render_failures,
            terminal = %self.terminal_phase,
            elapsed_ms = self.elapsed_ms,
            "war room run finished"
        );
    }
}

pub struct RunCollector {
    run_id: Uuid,
    company: String,
    domain: String,
    started: Instant,
    stage_started: Option<(AgentRole, Instant)>,
    stages: Vec<StageMetric>,
    documents_rendered: u32,
    render_failures: u32,
}

impl RunCollector {
    pub fn new(company: &str, domain: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            company: company.to_string(),
            domain: domain.to_string(),
            started: Instant::now(),
            stage_started: None,
            stages: Vec::new(),
            documents_rendered: 0,
            render_failures: 0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn start_stage(&mut self, stage: AgentRole) {
        self.stage_started = Some((stage, Instant::now()));
    }

    /// Close the open stage. No-op when none is open.
    pub fn finish_stage(&mut self, outcome: StageOutcome) {
        if let Some((stage, started)) = self.stage_started.take() {
            self.stages.push(StageMetric {
                stage,
                elapsed_ms: started.elapsed().as_millis() as u64,
                outcome,
            });
        }
    }

    pub fn record_documents(&mut self, documents: &DocumentSet) {
        for track in [&documents.customer, &documents.partner] {
            for name in [&track.dossier, &track.summary] {
                if name.is_some() {
                    self.documents_rendered += 1;
                } else {
                    self.render_failures += 1;
                }
            }
        }
    }

    /// `terminal` is `None` when the run was abandoned before a terminal event.
    pub fn finalize(mut self, terminal: Option<Phase>) -> RunMetrics {
        self.finish_stage(StageOutcome::Cancelled);
        RunMetrics {
            run_id: self.run_id,
            company: self.company,
            domain: self.domain,
            stages: self.stages,
            documents_rendered: self.documents_rendered,
            render_failures: self.render_failures,
            terminal_phase: terminal.map_or("CANCELLED", Phase::as_str).to_string(),
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Append one JSON line to `path`, creating the file and its parent.
pub fn append_metrics(metrics: &RunMetrics, path: &Path) {
    let json = match serde_json::to_string(metrics) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize run metrics: {e}");
            return;
        }
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create metrics directory: {e}");
            return;
        }
    }
    use std::io::Write;
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{json}") {
                warn!("Failed to append run metrics: {e}");
            } else {
                info!(path = %path.display(), "Appended run metrics");
            }
        }
        Err(e) => warn!("Failed to open metrics file: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliberation::TrackDocuments;
    use deliberation::schema::PerTrack;

    #[test]
    fn collector_tracks_stages_and_documents() {
        let mut c = RunCollector::new("Acme Corp", "acme-corp.io");
        c.start_stage(AgentRole::Advocate);
        c.finish_stage(StageOutcome::Ok);
        c.start_stage(AgentRole::Skeptic);
        c.finish_stage(StageOutcome::Ok);
        c.finish_stage(StageOutcome::Malformed);
        c.record_documents(&PerTrack::new(
            TrackDocuments {
                dossier: None,
                summary: Some("s.md".into()),
            },
            TrackDocuments {
                dossier: Some("d.md".into()),
                summary: Some("s2.md".into()),
            },
        ));
        let m = c.finalize(Some(Phase::Complete));
        assert_eq!(m.stages.len(), 2);
        assert_eq!(m.stages[1].stage, AgentRole::Skeptic);
        assert_eq!(m.documents_rendered, 3);
        assert_eq!(m.render_failures, 1);
        assert_eq!(m.terminal_phase, "COMPLETE");
    }

    #[test]
    fn open_stage_closed_on_cancel() {
        let mut c = RunCollector::new("Acme Corp", "acme-corp.io");
        c.start_stage(AgentRole::Auditor);
        let m = c.finalize(None);
        assert_eq!(m.stages[0].outcome, StageOutcome::Cancelled);
        assert_eq!(m.terminal_phase, "CANCELLED");
    }

    #[test]
    fn metrics_appended_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("runs.jsonl");
        let first = RunCollector::new("Acme Corp", "acme-corp.io").finalize(Some(Phase::Complete));
        let second = RunCollector::new("Globex", "globex.com").finalize(Some(Phase::Error));
        append_metrics(&first, &path);
        append_metrics(&second, &path);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let loaded: RunMetrics = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(loaded.company, "Globex");
        assert_ne!(loaded.run_id, first.run_id);
    }
}
