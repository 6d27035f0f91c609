//! Mock extraction tool for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::extractor::{ExtractionTool, ExtractorError};

/// A recorded tool invocation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExtraction {
    pub archive: PathBuf,
    pub dest: PathBuf,
}

/// Mock implementation of the [`ExtractionTool`] trait.
///
/// Records every invocation and succeeds by default; queue failures with
/// [`fail_next`](MockExtractionTool::fail_next) to exercise error paths.
#[derive(Debug, Clone, Default)]
pub struct MockExtractionTool {
    calls: Arc<RwLock<Vec<RecordedExtraction>>>,
    /// Errors consumed front-first, one per invocation.
    errors: Arc<RwLock<Vec<ExtractorError>>>,
}

impl MockExtractionTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded invocations, in call order.
    pub async fn calls(&self) -> Vec<RecordedExtraction> {
        self.calls.read().await.clone()
    }

    /// Queues an error; the next `extract` call consumes and returns it.
    pub async fn fail_next(&self, error: ExtractorError) {
        self.errors.write().await.push(error);
    }
}

#[async_trait]
impl ExtractionTool for MockExtractionTool {
    fn name(&self) -> &str {
        "mock-tool"
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractorError> {
        self.calls.write().await.push(RecordedExtraction {
            archive: archive.to_path_buf(),
            dest: dest.to_path_buf(),
        });
        let mut errors = self.errors.write().await;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.remove(0))
        }
    }
}
