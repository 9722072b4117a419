/// Rendered report artifacts on disk.
///
/// The existence of `reports/{id}.md` is the only cache signal: once a report
/// is written it is never fetched again. Writes go through a temp file and a
/// rename so a killed process cannot leave a half-written artifact behind.

use std::path::PathBuf;

use crate::error::{ArchiveError, Result};
use crate::utils::write_atomic;

#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, report_id: &str) -> PathBuf {
        self.dir.join(format!("{}.md", report_id))
    }

    pub async fn contains(&self, report_id: &str) -> bool {
        tokio::fs::try_exists(self.path_for(report_id))
            .await
            .unwrap_or(false)
    }

    pub async fn save(&self, report_id: &str, document: &str) -> Result<PathBuf> {
        if !is_safe_report_id(report_id) {
            return Err(ArchiveError::MalformedResponse {
                endpoint: "search".to_string(),
                reason: format!("report id {:?} is not usable as a file name", report_id),
            });
        }
        let path = self.path_for(report_id);
        write_atomic(&path, document).await?;
        Ok(path)
    }
}

/// Report ids become file names and URL path segments.
pub fn is_safe_report_id(report_id: &str) -> bool {
    !report_id.is_empty()
        && report_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
