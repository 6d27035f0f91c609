//! Extraction error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::history::HistoryError;

/// Errors from tool invocation and extraction orchestration.
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Extraction tool not found at {path}")]
    ToolNotFound { path: PathBuf },

    #[error("Extraction tool exited with code {code:?}")]
    ToolFailed {
        code: Option<i32>,
        /// Captured tool output, leniently decoded.
        output: String,
    },

    #[error("Extraction tool timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Failed to allocate destination {path}: {source}")]
    DestinationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
