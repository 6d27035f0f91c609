//! Mock torrent client for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentInfo};

/// Mock implementation of the [`TorrentClient`] trait.
///
/// Provides controllable behavior for testing:
/// - Set the torrent list returned by `list_torrents`
/// - Track pause calls for assertions
/// - Simulate failures per operation
#[derive(Debug, Clone, Default)]
pub struct MockTorrentClient {
    /// Current torrent list returned by every `list_torrents` call.
    torrents: Arc<RwLock<Vec<TorrentInfo>>>,
    /// Recorded `pause_torrents` calls, one hash list per call.
    paused: Arc<RwLock<Vec<Vec<String>>>>,
    /// Number of `authenticate` calls made.
    auth_calls: Arc<RwLock<u32>>,
    /// Number of `list_torrents` calls made, failed ones included.
    list_calls: Arc<RwLock<u32>>,
    /// If set, the next `authenticate` fails with this error.
    next_auth_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// If set, the next `list_torrents` fails with this error.
    next_list_error: Arc<RwLock<Option<TorrentClientError>>>,
    /// If set, the next `pause_torrents` fails with this error.
    next_pause_error: Arc<RwLock<Option<TorrentClientError>>>,
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the torrent list that `list_torrents` returns.
    pub async fn set_torrents(&self, torrents: Vec<TorrentInfo>) {
        *self.torrents.write().await = torrents;
    }

    /// Adds one torrent to the list.
    pub async fn add_torrent(&self, info: TorrentInfo) {
        self.torrents.write().await.push(info);
    }

    /// Sets the progress of the torrent with `hash`, if present.
    pub async fn set_progress(&self, hash: &str, progress: f64) {
        let mut torrents = self.torrents.write().await;
        if let Some(t) = torrents.iter_mut().find(|t| t.hash == hash) {
            t.progress = progress.clamp(0.0, 1.0);
        }
    }

    /// All recorded `pause_torrents` calls, in call order.
    pub async fn pause_calls(&self) -> Vec<Vec<String>> {
        self.paused.read().await.clone()
    }

    /// Number of `authenticate` calls made so far.
    pub async fn auth_call_count(&self) -> u32 {
        *self.auth_calls.read().await
    }

    /// Number of `list_torrents` calls made so far, failed ones included.
    pub async fn list_call_count(&self) -> u32 {
        *self.list_calls.read().await
    }

    /// The next `authenticate` call fails with `error`.
    pub async fn fail_next_auth(&self, error: TorrentClientError) {
        *self.next_auth_error.write().await = Some(error);
    }

    /// The next `list_torrents` call fails with `error`.
    pub async fn fail_next_list(&self, error: TorrentClientError) {
        *self.next_list_error.write().await = Some(error);
    }

    /// The next `pause_torrents` call fails with `error`.
    pub async fn fail_next_pause(&self, error: TorrentClientError) {
        *self.next_pause_error.write().await = Some(error);
    }

    /// Builds a complete torrent with reasonable defaults.
    pub fn completed_torrent(hash: &str, name: &str, content_path: impl Into<PathBuf>) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: name.to_string(),
            progress: 1.0,
            content_path: content_path.into(),
        }
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn authenticate(&self) -> Result<(), TorrentClientError> {
        *self.auth_calls.write().await += 1;
        if let Some(e) = self.next_auth_error.write().await.take() {
            return Err(e);
        }
        Ok(())
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        *self.list_calls.write().await += 1;
        if let Some(e) = self.next_list_error.write().await.take() {
            return Err(e);
        }
        Ok(self.torrents.read().await.clone())
    }

    async fn pause_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        if let Some(e) = self.next_pause_error.write().await.take() {
            return Err(e);
        }
        self.paused.write().await.push(hashes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_reflects_configured_torrents() {
        let client = MockTorrentClient::new();
        client
            .add_torrent(MockTorrentClient::completed_torrent(
                "abc", "Test", "/dl/Test",
            ))
            .await;
        client.set_progress("abc", 0.5).await;

        let torrents = client.list_torrents().await.unwrap();
        assert_eq!(torrents.len(), 1);
        assert!(!torrents[0].is_complete());
    }

    #[tokio::test]
    async fn test_injected_errors_fire_once() {
        let client = MockTorrentClient::new();
        client
            .fail_next_list(TorrentClientError::Timeout)
            .await;

        assert!(client.list_torrents().await.is_err());
        assert!(client.list_torrents().await.is_ok());
    }

    #[tokio::test]
    async fn test_pause_calls_are_recorded() {
        let client = MockTorrentClient::new();
        client
            .pause_torrents(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(client.pause_calls().await, vec![vec!["a".to_string(), "b".to_string()]]);
    }
}
