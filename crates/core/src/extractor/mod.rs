//! Extraction orchestration.
//!
//! Takes one archive set, allocates an output location according to the
//! destination policy, invokes the external extraction tool against the
//! set's primary part, records the outcome durably and publishes events in
//! a fixed order. The tool itself sits behind the [`ExtractionTool`] trait;
//! [`SevenZipTool`] is the shipped implementation.

mod error;
mod orchestrator;
mod seven_zip;
mod types;

pub use error::ExtractorError;
pub use orchestrator::ExtractionOrchestrator;
pub use seven_zip::SevenZipTool;
pub use types::{DestinationPolicy, ExtractionTool};
