//! Types for torrent service operations.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur talking to the torrent service.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

/// A torrent as reported by the service. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex); the deduplication key.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Download progress (0.0 - 1.0); 1.0 means fully downloaded.
    pub progress: f64,
    /// Where the downloaded content lives on disk.
    pub content_path: PathBuf,
}

impl TorrentInfo {
    /// True once the service reports the download fully complete.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// Trait for torrent service backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Authenticate against the service. Called once per monitoring run;
    /// failure is fatal to that run.
    async fn authenticate(&self) -> Result<(), TorrentClientError>;

    /// Fetch the full current torrent list.
    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Pause the given torrents.
    async fn pause_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError>;
}
