//! Single-extraction orchestration.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::archive::ArchiveSet;
use crate::events::{EventBus, UnpackEvent};
use crate::history::{ExtractionOutcome, ExtractionRecord, HistoryStore};

use super::error::ExtractorError;
use super::types::{DestinationPolicy, ExtractionTool};

/// Runs one archive set through the tool and records the outcome.
///
/// Every attempt, pass or fail, leaves a durable history record and an
/// `ExtractionSucceeded`/`ExtractionFailed` event. A tool failure is an
/// outcome, not an error; `Err` is reserved for the orchestrator's own
/// infrastructure (destination allocation, history writes).
pub struct ExtractionOrchestrator<T: ExtractionTool> {
    tool: T,
    history: HistoryStore,
    events: EventBus,
    destination: DestinationPolicy,
    delete_on_success: bool,
}

impl<T: ExtractionTool> ExtractionOrchestrator<T> {
    pub fn new(
        tool: T,
        history: HistoryStore,
        events: EventBus,
        destination: DestinationPolicy,
        delete_on_success: bool,
    ) -> Self {
        Self {
            tool,
            history,
            events,
            destination,
            delete_on_success,
        }
    }

    /// Extracts one archive set. `containing_name` is the logical name of
    /// the originating download, used for the destination folder and the
    /// history record.
    ///
    /// Progress events bracket the attempt: status and `ProgressStart`
    /// before the tool runs, `ProgressStop` and a return to the monitoring
    /// status afterwards, regardless of outcome.
    pub async fn extract(
        &self,
        set: &ArchiveSet,
        containing_name: &str,
    ) -> Result<ExtractionRecord, ExtractorError> {
        let primary_name = set
            .primary()
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| set.base_name.clone());
        self.events.status(format!("Extracting: {}", primary_name));
        self.events.emit(UnpackEvent::ProgressStart);

        let result = self.extract_inner(set, containing_name).await;

        self.events.emit(UnpackEvent::ProgressStop);
        self.events.status("Monitoring...");
        result
    }

    async fn extract_inner(
        &self,
        set: &ArchiveSet,
        containing_name: &str,
    ) -> Result<ExtractionRecord, ExtractorError> {
        let primary = &set.primary().path;
        let parent = primary.parent().unwrap_or_else(|| Path::new("."));

        let (name, dest) = match self.destination {
            DestinationPolicy::Subfolder => self.allocate_subfolder(parent, containing_name).await?,
            DestinationPolicy::Flat => (containing_name.to_string(), parent.to_path_buf()),
        };

        info!(
            "Extracting '{}' to '{}' with {}",
            primary.display(),
            dest.display(),
            self.tool.name()
        );
        self.events.log(format!(
            "Extracting '{}' to '{}'",
            primary.display(),
            dest.display()
        ));

        match self.tool.extract(primary, &dest).await {
            Ok(()) => {
                let record = ExtractionRecord {
                    outcome: ExtractionOutcome::Success,
                    name: name.clone(),
                    path: dest.clone(),
                };
                self.history.append(&record)?;
                info!("Extraction succeeded: {}", name);
                self.events.log(format!("Extracted '{}' successfully", name));
                self.events
                    .emit(UnpackEvent::ExtractionSucceeded { name, path: dest });

                if self.delete_on_success {
                    self.delete_parts(set).await;
                }
                Ok(record)
            }
            Err(e) => {
                error!("Extraction of '{}' failed: {}", name, e);
                self.events
                    .log(format!("Extraction of '{}' failed: {}", name, e));
                if let ExtractorError::ToolFailed { output, .. } = &e {
                    if !output.is_empty() {
                        error!("Tool output:\n{}", output);
                        self.events.log(format!("Tool output:\n{}", output));
                    }
                }
                let record = ExtractionRecord {
                    outcome: ExtractionOutcome::Failure,
                    name: name.clone(),
                    path: dest.clone(),
                };
                self.history.append(&record)?;
                self.events
                    .emit(UnpackEvent::ExtractionFailed { name, path: dest });
                Ok(record)
            }
        }
    }

    /// Creates the output folder next to the archive, suffixing ` (2)`,
    /// ` (3)`, … until an unused name is found. Creation, not a prior
    /// existence check, claims the name.
    async fn allocate_subfolder(
        &self,
        parent: &Path,
        containing_name: &str,
    ) -> Result<(String, PathBuf), ExtractorError> {
        let mut name = containing_name.to_string();
        let mut attempt = 1u32;
        loop {
            let dest = parent.join(&name);
            match tokio::fs::create_dir(&dest).await {
                Ok(()) => return Ok((name, dest)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempt += 1;
                    name = format!("{} ({})", containing_name, attempt);
                }
                Err(e) => {
                    return Err(ExtractorError::DestinationFailed {
                        path: dest,
                        source: e,
                    })
                }
            }
        }
    }

    /// Deletes the set's part files after a successful extraction. A part
    /// that cannot be deleted is logged and skipped; the extraction stays
    /// successful.
    async fn delete_parts(&self, set: &ArchiveSet) {
        for path in set.part_paths() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    info!("Deleted archive part: {}", path.display());
                    self.events
                        .log(format!("Deleted archive part '{}'", path.display()));
                }
                Err(e) => {
                    warn!("Failed to delete archive part '{}': {}", path.display(), e);
                    self.events.log(format!(
                        "Failed to delete archive part '{}': {}",
                        path.display(),
                        e
                    ));
                }
            }
        }
    }
}
