use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};

use crate::core::report_store::{is_safe_report_id, ReportStore};
use crate::core::run_summary::{RecordOutcome, RunSummary};
use crate::core::throttle::RequestThrottle;
use crate::error::{ArchiveError, Result};
use crate::http::Transport;
use crate::model::{DetailOutcome, DetailRecord, SummaryRecord};
use crate::modules::attachments::AttachmentFetcher;
use crate::modules::comments::CommentFormatter;
use crate::modules::hacktivity::ReportFetcher;
use crate::modules::renderer::ReportRenderer;
use crate::utils::ensure_directories;
use crate::{ArchiveConfig, SinkRef};

/// Sequential archiving run over one page of disclosed reports.
///
/// 1. Fetches the search page once; failure here ends the run.
/// 2. For each hit, in order: fetch detail (skipped when already archived),
///    merge (which validates required fields), format comments, render,
///    persist.
/// 3. Per-record failures are logged and recorded, never fatal.
///
/// Each record is fully written before the next one starts, so stopping
/// between records never leaves a partial artifact.
pub struct Pipeline {
    config: ArchiveConfig,
    fetcher: ReportFetcher,
    formatter: CommentFormatter,
    store: ReportStore,
    sink: SinkRef,
}

impl Pipeline {
    pub fn new(config: ArchiveConfig, transport: Arc<dyn Transport>, sink: SinkRef) -> Self {
        let store = ReportStore::new(config.reports_dir());
        let fetcher = ReportFetcher::new(
            Arc::clone(&transport),
            &config.base_url,
            store.clone(),
            RequestThrottle::new(config.rate_limit_delay_ms),
        );
        let formatter = CommentFormatter::new(
            AttachmentFetcher::new(transport, config.attachments_dir()),
            config.allowed_content_types.clone(),
        );

        Self {
            config,
            fetcher,
            formatter,
            store,
            sink,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let count = NonZeroUsize::new(self.config.count).ok_or_else(|| {
            ArchiveError::Config("report count must be a positive integer".to_string())
        })?;

        ensure_directories(&self.config).await?;

        self.sink.on_progress("Fetching hacktivity page", 0, 0);
        let records = self.fetcher.fetch_summary_page(count).await?;
        self.sink.on_log(
            "success",
            &format!("[+] Received {} report(s) from the search index.", records.len()),
        );

        let mut summary = RunSummary::new();
        let total = records.len();

        for (i, record) in records.iter().enumerate() {
            let outcome = self.process_record(record).await;
            self.sink.on_progress(
                &format!("Processed report {}", outcome.report_id()),
                i + 1,
                total,
            );
            summary.record(outcome);
        }

        Ok(summary)
    }

    async fn process_record(&self, record: &SummaryRecord) -> RecordOutcome {
        let report_id = match record.id.as_deref() {
            Some(id) if is_safe_report_id(id) => id.to_string(),
            other => {
                let reason = format!("unusable report id {:?}", other);
                warn!("Skipping search hit: {}", reason);
                return RecordOutcome::Failed {
                    report_id: other.unwrap_or("<unknown>").to_string(),
                    reason,
                };
            }
        };

        info!("Processing report {}", report_id);

        let detail = match self.fetcher.fetch_detail(&report_id).await {
            Ok(DetailOutcome::Cached) => {
                info!("Report {} already archived", report_id);
                return RecordOutcome::Cached { report_id };
            }
            Ok(DetailOutcome::Fetched(detail)) => detail,
            Err(e) => {
                error!("Error fetching report {}: {}", report_id, e);
                return RecordOutcome::Failed {
                    report_id,
                    reason: e.to_string(),
                };
            }
        };

        match self.archive(&report_id, record, &detail).await {
            Ok(path) => {
                self.sink.on_log("success", &format!("[+] Archived report {}", report_id));
                RecordOutcome::Archived { report_id, path }
            }
            Err(e) if e.is_data_error() => {
                warn!("Skipping report {}: {}", report_id, e);
                RecordOutcome::Failed {
                    report_id,
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                error!("Error archiving report {}: {}", report_id, e);
                RecordOutcome::Failed {
                    report_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn archive(
        &self,
        report_id: &str,
        record: &SummaryRecord,
        detail: &DetailRecord,
    ) -> Result<PathBuf> {
        let mut merged = ReportRenderer::merge(record, detail, Vec::new())?;
        merged.comments = self.formatter.format(record.raw_comments()).await;
        let document = ReportRenderer::render(&merged)?;
        self.store.save(report_id, &document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeTransport;
    use crate::NullSink;
    use serde_json::json;

    fn config(dir: &std::path::Path, count: usize) -> ArchiveConfig {
        ArchiveConfig {
            base_url: "https://h1.test".to_string(),
            downloads_dir: dir.to_path_buf(),
            count,
            rate_limit_delay_ms: 0,
            ..Default::default()
        }
    }

    fn node(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "reporter": { "_id": "1", "username": "alice" },
            "cve_ids": [],
            "severity_rating": "medium",
            "votes": 3,
            "program": { "handle": "acme", "name": "Acme", "currency": "usd" },
            "total_awarded_amount": 0,
            "report": { "substate": "resolved", "comments": { "nodes": [] } }
        })
    }

    #[tokio::test]
    async fn test_zero_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new());
        let pipeline = Pipeline::new(config(dir.path(), 0), transport.clone(), NullSink::new_ref());

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, ArchiveError::Config(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_detail_does_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(
            "https://h1.test/graphql",
            json!({ "data": { "search": { "nodes": [node("1"), node("2")] } } }),
        );
        transport.fail("https://h1.test/reports/1.json", 500);
        transport.respond_json(
            "https://h1.test/reports/2.json",
            json!({ "title": "Second", "vulnerability_information": "details", "summaries": [] }),
        );

        let pipeline = Pipeline::new(config(dir.path(), 2), transport, NullSink::new_ref());
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.archived_count(), 1);
        assert!(!dir.path().join("reports/1.md").exists());
        assert!(dir.path().join("reports/2.md").exists());
    }

    #[tokio::test]
    async fn test_incomplete_record_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new());
        let mut broken = node("5");
        broken["program"] = json!(null);
        transport.respond_json(
            "https://h1.test/graphql",
            json!({ "data": { "search": { "nodes": [broken, node("6")] } } }),
        );
        transport.respond_json(
            "https://h1.test/reports/",
            json!({ "title": "T", "vulnerability_information": "V", "summaries": [] }),
        );

        let pipeline = Pipeline::new(config(dir.path(), 2), transport, NullSink::new_ref());
        let summary = pipeline.run().await.unwrap();

        assert!(matches!(
            &summary.outcomes[0],
            RecordOutcome::Failed { report_id, reason } if report_id == "5" && reason.contains("program")
        ));
        assert!(dir.path().join("reports/6.md").exists());
    }

    #[tokio::test]
    async fn test_invalid_record_never_fetches_its_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new());
        let mut broken = node("7");
        broken["severity_rating"] = json!(null);
        broken["report"]["comments"]["nodes"] = json!([{
            "message": "PoC attached",
            "actor": { "username": "alice" },
            "attachments": [{
                "_id": "a1",
                "file_name": "poc.md",
                "url": "https://files.test/poc.md",
                "content_type": "text/markdown"
            }]
        }]);
        transport.respond_json(
            "https://h1.test/graphql",
            json!({ "data": { "search": { "nodes": [broken] } } }),
        );
        transport.respond_json(
            "https://h1.test/reports/7.json",
            json!({ "title": "T", "vulnerability_information": "V", "summaries": [] }),
        );
        transport.respond("https://files.test/", "body");

        let pipeline = Pipeline::new(config(dir.path(), 1), transport.clone(), NullSink::new_ref());
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.failed_count(), 1);
        assert_eq!(transport.calls_matching("files.test"), 0);
        assert!(!dir.path().join("attachments/poc.md").exists());
    }

    #[tokio::test]
    async fn test_summary_page_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new());
        transport.fail("https://h1.test/graphql", 503);

        let pipeline = Pipeline::new(config(dir.path(), 1), transport, NullSink::new_ref());
        assert!(matches!(
            pipeline.run().await.unwrap_err(),
            ArchiveError::Transport(_)
        ));
    }
}
