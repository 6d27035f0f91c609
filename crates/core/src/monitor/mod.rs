//! Completion monitoring.
//!
//! Polls the torrent service for finished downloads inside the monitored
//! folder and feeds each newly completed one through the extraction
//! orchestrator exactly once per run. The [`Monitor`] runner owns the
//! background task lifecycle; [`CompletionPoller`] is the loop itself.

mod poller;
mod runner;
mod types;

pub use poller::CompletionPoller;
pub use runner::Monitor;
pub use types::{MonitorError, MonitorState, PollerSettings};
