pub mod core;
pub mod error;
pub mod http;
pub mod model;
pub mod modules;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub use crate::core::pipeline::Pipeline;
pub use crate::core::run_summary::{RecordOutcome, RunSummary};
pub use crate::error::{ArchiveError, AttachmentFetchError};
pub use crate::http::{HttpClient, Transport, TransportError};
pub use crate::model::{Attachment, Comment, DetailOutcome, DetailRecord, MergedReport, SummaryRecord};
pub use crate::modules::attachments::AttachmentFetcher;
pub use crate::modules::comments::CommentFormatter;
pub use crate::modules::hacktivity::ReportFetcher;
pub use crate::modules::renderer::ReportRenderer;

pub const DEFAULT_BASE_URL: &str = "https://hackerone.com";
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &["text/markdown", "text/x-diff"];

/// Run configuration shared by the CLI and library callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveConfig {
    pub base_url: String,
    pub downloads_dir: PathBuf,
    pub count: usize,
    pub rate_limit_delay_ms: u64,
    pub timeout_secs: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            downloads_dir: PathBuf::from("downloads"),
            count: 10,
            rate_limit_delay_ms: 1000,
            timeout_secs: 30,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ArchiveConfig {
    pub fn reports_dir(&self) -> PathBuf {
        self.downloads_dir.join("reports")
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.downloads_dir.join("attachments")
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Output abstraction for the pipeline.
/// The CLI implements this with colored terminal output.
pub trait PipelineEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_progress(&self, phase: &str, current: usize, total: usize);
}

pub type SinkRef = Arc<dyn PipelineEventSink>;

/// Terminal output sink for CLI usage.
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl PipelineEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        let colored = match level {
            "success" => message.green().to_string(),
            "error" => message.red().to_string(),
            "warn" => message.yellow().to_string(),
            "phase" => message.bright_cyan().bold().to_string(),
            _ => message.to_string(),
        };
        println!("{}", colored);
    }

    fn on_progress(&self, phase: &str, current: usize, total: usize) {
        use colored::*;
        if total > 0 {
            println!("{}", format!("[*] {} ({}/{})", phase, current, total).bright_cyan());
        } else {
            println!("{}", format!("[*] {}", phase).bright_cyan());
        }
    }
}

/// Sink that discards everything; handy for library callers and tests.
pub struct NullSink;

impl NullSink {
    pub fn new_ref() -> SinkRef {
        Arc::new(Self)
    }
}

impl PipelineEventSink for NullSink {
    fn on_log(&self, _level: &str, _message: &str) {}
    fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
}
