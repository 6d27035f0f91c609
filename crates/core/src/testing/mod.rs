//! Testing utilities and mock implementations.
//!
//! Mock implementations of the external service seams (torrent service,
//! extraction tool), allowing the monitoring loop and orchestrator to be
//! exercised end to end without a running qBittorrent or a 7-Zip binary.

mod mock_extraction_tool;
mod mock_torrent_client;

pub use mock_extraction_tool::{MockExtractionTool, RecordedExtraction};
pub use mock_torrent_client::MockTorrentClient;
