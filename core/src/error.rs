use thiserror::Error;

use crate::http::TransportError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("report {report_id} is missing required field `{field}`")]
    IncompleteData { report_id: String, field: &'static str },

    #[error("report {report_id} has unknown currency code `{code}`")]
    UnknownCurrency { report_id: String, code: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn incomplete(report_id: &str, field: &'static str) -> Self {
        ArchiveError::IncompleteData {
            report_id: report_id.to_string(),
            field,
        }
    }

    /// Data errors are scoped to a single report and never abort the run.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ArchiveError::IncompleteData { .. } | ArchiveError::UnknownCurrency { .. }
        )
    }
}

/// Attachment failures are recovered into a placeholder by the fetcher.
#[derive(Debug, Error)]
pub enum AttachmentFetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;
