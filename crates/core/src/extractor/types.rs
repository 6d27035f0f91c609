//! Types for extraction orchestration.

use std::path::Path;

use async_trait::async_trait;

use super::error::ExtractorError;

/// Where extracted output lands, configuration-selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationPolicy {
    /// Extract into a freshly created subfolder next to the primary part,
    /// uniquified with ` (2)`, ` (3)`, … if the name is taken.
    Subfolder,
    /// Extract directly into the primary part's parent directory.
    Flat,
}

/// Seam over the external extraction tool.
///
/// An implementation extracts the archive rooted at `archive` into `dest`
/// with overwrite semantics, returning `Ok(())` only on a clean exit.
#[async_trait]
pub trait ExtractionTool: Send + Sync {
    /// Tool name for logging.
    fn name(&self) -> &str;

    /// Run the tool to completion against one archive.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractorError>;
}
