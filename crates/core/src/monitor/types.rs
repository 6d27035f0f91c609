//! Types for the completion monitor.

use std::time::Duration;

use thiserror::Error;

use crate::config::MonitorConfig;
use crate::torrent_client::TorrentClientError;

/// Errors from the monitoring loop and its runner.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Initial authentication against the torrent service failed. Fatal to
    /// the run; later per-poll failures back off instead.
    #[error("Failed to connect to torrent service: {0}")]
    Connection(#[source] TorrentClientError),

    #[error("Monitor is already running")]
    AlreadyRunning,

    #[error("Monitor task did not stop within {grace_secs}s")]
    ShutdownTimeout { grace_secs: u64 },
}

/// Where the monitoring loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Not started yet.
    Idle,
    /// Authenticating against the torrent service.
    Connecting,
    /// Between ticks, waiting the normal poll interval.
    Polling,
    /// A poll failed; waiting the longer backoff interval before retrying.
    BackoffWait,
    /// The loop has exited.
    Stopped,
}

/// Loop timing, kept as `Duration`s so tests can run at millisecond scale.
#[derive(Debug, Clone, Copy)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    pub backoff: Duration,
}

impl PollerSettings {
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            backoff: Duration::from_secs(config.backoff_secs),
        }
    }
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_match_config_defaults() {
        let settings = PollerSettings::default();
        assert_eq!(settings.poll_interval, Duration::from_secs(15));
        assert_eq!(settings.backoff, Duration::from_secs(60));
    }
}
