use std::path::PathBuf;

use crate::SinkRef;

/// What happened to one search hit during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Archived { report_id: String, path: PathBuf },
    Cached { report_id: String },
    Failed { report_id: String, reason: String },
}

impl RecordOutcome {
    pub fn report_id(&self) -> &str {
        match self {
            RecordOutcome::Archived { report_id, .. }
            | RecordOutcome::Cached { report_id }
            | RecordOutcome::Failed { report_id, .. } => report_id,
        }
    }
}

/// Per-run ledger returned by the pipeline, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub outcomes: Vec<RecordOutcome>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: RecordOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn archived(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Archived { .. }))
    }

    pub fn archived_count(&self) -> usize {
        self.archived().count()
    }

    pub fn cached_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Cached { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Failed { .. }))
            .count()
    }

    pub fn report_summary(&self, sink: &SinkRef) {
        sink.on_log(
            "phase",
            &format!(
                "[*] Run finished: {} archived, {} already cached, {} failed.",
                self.archived_count(),
                self.cached_count(),
                self.failed_count()
            ),
        );

        for outcome in &self.outcomes {
            match outcome {
                RecordOutcome::Archived { report_id, path } => {
                    sink.on_log("success", &format!("  [+] {} → {}", report_id, path.display()));
                }
                RecordOutcome::Cached { .. } => {}
                RecordOutcome::Failed { report_id, reason } => {
                    sink.on_log("error", &format!("  [!] {}: {}", report_id, reason));
                }
            }
        }
    }
}
