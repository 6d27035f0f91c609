//! Durable extraction history.
//!
//! Append-only UTF-8 text log, one `STATUS:NAME:PATH` record per line. The
//! file doubles as the replay source on startup and as the manifest for
//! bulk deletion of previously extracted output.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

/// Errors from the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("History I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of an extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Success,
    Failure,
}

impl ExtractionOutcome {
    /// On-disk status token.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionOutcome::Success => "SUCCESS",
            ExtractionOutcome::Failure => "FAILURE",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(ExtractionOutcome::Success),
            "FAILURE" => Some(ExtractionOutcome::Failure),
            _ => None,
        }
    }
}

/// One durable extraction fact. Immutable once written; a re-extraction
/// appends a new record under the same name rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub outcome: ExtractionOutcome,
    /// Logical name: the containing folder of the originating download.
    pub name: String,
    /// Destination the tool wrote into.
    pub path: PathBuf,
}

/// Counts from a bulk deletion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub deleted: usize,
    pub failed: usize,
}

/// File-backed history store.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a store over the given log file. The file is created lazily
    /// on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record, durably. Returns only after the line has been
    /// flushed to stable storage.
    pub fn append(&self, record: &ExtractionRecord) -> Result<(), HistoryError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{}:{}:{}",
            record.outcome.as_str(),
            record.name,
            record.path.display()
        )?;
        file.sync_all()?;
        Ok(())
    }

    /// Replays the log in order. Malformed lines (fewer than three
    /// colon-delimited fields, or an unknown status) are skipped without
    /// failing the load; a missing file is an empty history.
    pub fn load_all(&self) -> Result<Vec<ExtractionRecord>, HistoryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // PATH may itself contain colons; only the first two split.
            let mut fields = line.splitn(3, ':');
            let (status, name, path) = match (fields.next(), fields.next(), fields.next()) {
                (Some(s), Some(n), Some(p)) => (s, n, p),
                _ => {
                    warn!("Skipping malformed history line: {:?}", line);
                    continue;
                }
            };
            let Some(outcome) = ExtractionOutcome::parse(status) else {
                warn!("Skipping history line with unknown status: {:?}", line);
                continue;
            };
            records.push(ExtractionRecord {
                outcome,
                name: name.to_string(),
                path: PathBuf::from(path),
            });
        }
        Ok(records)
    }

    /// Truncates the store.
    pub fn clear(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every still-existing path referenced by `records`
    /// (directories recursively, files singly), continuing past individual
    /// failures, then clears the store.
    pub fn delete_all(&self, records: &[ExtractionRecord]) -> Result<DeleteSummary, HistoryError> {
        let mut summary = DeleteSummary::default();
        for record in records {
            let path = &record.path;
            let result = if path.is_dir() {
                fs::remove_dir_all(path).map(|()| true)
            } else if path.exists() {
                fs::remove_file(path).map(|()| true)
            } else {
                Ok(false)
            };
            match result {
                Ok(true) => {
                    info!("Deleted extracted output: {}", path.display());
                    summary.deleted += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to delete '{}': {}", path.display(), e);
                    summary.failed += 1;
                }
            }
        }
        self.clear()?;
        Ok(summary)
    }
}
