//! The completion polling loop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use crate::archive::group;
use crate::events::EventBus;
use crate::extractor::{ExtractionOrchestrator, ExtractionTool};
use crate::torrent_client::{TorrentClient, TorrentClientError, TorrentInfo};

use super::types::{MonitorError, MonitorState, PollerSettings};

/// One monitoring run: authenticate once, then poll until shut down.
///
/// Dispatch is per info hash, at most once per run. The processed set is
/// shared with the runner so consecutive runs within one process do not
/// re-extract; it is not persisted across restarts.
pub struct CompletionPoller<T: ExtractionTool> {
    client: Arc<dyn TorrentClient>,
    orchestrator: Arc<ExtractionOrchestrator<T>>,
    events: EventBus,
    monitor_root: PathBuf,
    processed: Arc<RwLock<HashSet<String>>>,
    settings: PollerSettings,
    shutdown: watch::Receiver<bool>,
    state: MonitorState,
}

impl<T: ExtractionTool> CompletionPoller<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<dyn TorrentClient>,
        orchestrator: Arc<ExtractionOrchestrator<T>>,
        events: EventBus,
        monitor_root: PathBuf,
        processed: Arc<RwLock<HashSet<String>>>,
        settings: PollerSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            orchestrator,
            events,
            monitor_root,
            processed,
            settings,
            shutdown,
            state: MonitorState::Idle,
        }
    }

    fn set_state(&mut self, state: MonitorState) {
        debug!("Monitor state: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Runs the loop to completion. Returns `Err` only when the initial
    /// authentication fails; every later failure backs off and retries.
    pub async fn run(mut self) -> Result<(), MonitorError> {
        self.set_state(MonitorState::Connecting);
        self.events.status("Connecting...");
        if let Err(e) = self.client.authenticate().await {
            error!("Authentication against {} failed: {}", self.client.name(), e);
            self.events
                .log(format!("Failed to connect to {}: {}", self.client.name(), e));
            self.set_state(MonitorState::Stopped);
            return Err(MonitorError::Connection(e));
        }
        info!("Connected to {}", self.client.name());
        self.events.status("Monitoring...");

        loop {
            let wait = match self.tick().await {
                Ok(()) => {
                    self.set_state(MonitorState::Polling);
                    self.settings.poll_interval
                }
                Err(e) => {
                    warn!("Poll failed, backing off: {}", e);
                    self.events.log(format!("Poll failed: {}", e));
                    self.set_state(MonitorState::BackoffWait);
                    self.settings.backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = self.shutdown.changed() => {
                    // A closed channel means the runner is gone; stop too.
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Monitoring loop stopped");
        self.set_state(MonitorState::Stopped);
        Ok(())
    }

    /// One poll: fetch the full torrent list and dispatch every newly
    /// completed torrent inside the monitored folder, in list order.
    async fn tick(&self) -> Result<(), TorrentClientError> {
        let torrents = self.client.list_torrents().await?;

        let mut ready = Vec::new();
        for torrent in torrents {
            if !torrent.is_complete() {
                continue;
            }
            if self.processed.read().await.contains(&torrent.hash) {
                continue;
            }
            if !self.is_within_root(&torrent.content_path) {
                debug!(
                    "Skipping '{}': content path {} outside monitored folder",
                    torrent.name,
                    torrent.content_path.display()
                );
                continue;
            }
            ready.push(torrent);
        }

        let total = ready.len();
        for (i, torrent) in ready.into_iter().enumerate() {
            self.events
                .status(format!("Processing ({}/{}): {}", i + 1, total, torrent.name));
            // Mark before dispatching so a failed extraction is never
            // retried on the next tick.
            self.processed.write().await.insert(torrent.hash.clone());
            self.process_torrent(&torrent).await;
        }

        Ok(())
    }

    /// Handles one completed torrent. Failures are contained: they are
    /// logged and the tick moves on to the next torrent.
    async fn process_torrent(&self, torrent: &TorrentInfo) {
        info!("Download complete: {}", torrent.name);
        self.events
            .log(format!("Download complete: {}", torrent.name));

        if let Err(e) = self.client.pause_torrents(&[torrent.hash.clone()]).await {
            warn!("Failed to pause '{}': {}", torrent.name, e);
            self.events
                .log(format!("Failed to pause '{}': {}", torrent.name, e));
        }

        let containing_name = torrent
            .content_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| torrent.name.clone());

        let sets = match group(&torrent.content_path) {
            Ok(sets) => sets,
            Err(e) => {
                error!(
                    "Failed to scan '{}' for archives: {}",
                    torrent.content_path.display(),
                    e
                );
                self.events
                    .log(format!("Failed to scan '{}': {}", torrent.name, e));
                return;
            }
        };

        if sets.is_empty() {
            debug!("No archives found in '{}'", torrent.content_path.display());
            return;
        }

        for set in &sets {
            if let Err(e) = self.orchestrator.extract(set, &containing_name).await {
                error!("Extraction of '{}' failed: {}", set.base_name, e);
                self.events
                    .log(format!("Extraction of '{}' failed: {}", set.base_name, e));
            }
        }
    }

    /// Path containment against the monitored folder, resolved through the
    /// filesystem rather than compared as strings. A content path that no
    /// longer exists is not dispatchable.
    fn is_within_root(&self, path: &Path) -> bool {
        let root = self
            .monitor_root
            .canonicalize()
            .unwrap_or_else(|_| self.monitor_root.clone());
        match path.canonicalize() {
            Ok(resolved) => resolved.starts_with(&root),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventReceiver;
    use crate::extractor::DestinationPolicy;
    use crate::history::HistoryStore;
    use crate::testing::{MockExtractionTool, MockTorrentClient};
    use crate::extractor::ExtractorError;
    use std::fs;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        root: TempDir,
        client: Arc<MockTorrentClient>,
        tool: MockExtractionTool,
        processed: Arc<RwLock<HashSet<String>>>,
        shutdown_tx: watch::Sender<bool>,
        _rx: EventReceiver,
        poller: CompletionPoller<MockExtractionTool>,
    }

    fn fixture() -> Fixture {
        fixture_with_settings(PollerSettings {
            poll_interval: Duration::from_millis(5),
            backoff: Duration::from_millis(20),
        })
    }

    fn fixture_with_settings(settings: PollerSettings) -> Fixture {
        let root = tempdir().unwrap();
        let client = Arc::new(MockTorrentClient::new());
        let tool = MockExtractionTool::new();
        let (events, rx) = EventBus::channel();
        let history = HistoryStore::new(root.path().join("extractions.log"));
        let orchestrator = Arc::new(ExtractionOrchestrator::new(
            tool.clone(),
            history,
            events.clone(),
            DestinationPolicy::Subfolder,
            false,
        ));
        let processed = Arc::new(RwLock::new(HashSet::new()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = CompletionPoller::new(
            client.clone() as Arc<dyn TorrentClient>,
            orchestrator,
            events,
            root.path().to_path_buf(),
            processed.clone(),
            settings,
            shutdown_rx,
        );
        Fixture {
            root,
            client,
            tool,
            processed,
            shutdown_tx,
            _rx: rx,
            poller,
        }
    }

    fn seed_download(root: &Path, name: &str, parts: &[&str]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir(&dir).unwrap();
        for part in parts {
            fs::write(dir.join(part), b"bytes").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_completed_torrent_is_dispatched_once_across_ticks() {
        let f = fixture();
        let content = seed_download(f.root.path(), "MyDownload", &["x.part1.rar", "x.part2.rar"]);
        f.client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "MyDownload", &content))
            .await;

        f.poller.tick().await.unwrap();
        f.poller.tick().await.unwrap();
        f.poller.tick().await.unwrap();

        let calls = f.tool.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].archive, content.join("x.part1.rar"));
        assert_eq!(f.client.pause_calls().await, vec![vec!["abc".to_string()]]);
        assert!(f.processed.read().await.contains("abc"));
    }

    #[tokio::test]
    async fn test_incomplete_torrent_is_not_dispatched() {
        let f = fixture();
        let content = seed_download(f.root.path(), "Partial", &["x.rar"]);
        let mut info = MockTorrentClient::completed_torrent("abc", "Partial", &content);
        info.progress = 0.97;
        f.client.add_torrent(info).await;

        f.poller.tick().await.unwrap();
        assert!(f.tool.calls().await.is_empty());
        assert!(f.processed.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_content_outside_monitored_folder_is_skipped() {
        let f = fixture();
        let elsewhere = tempdir().unwrap();
        let content = seed_download(elsewhere.path(), "Elsewhere", &["x.rar"]);
        f.client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "Elsewhere", &content))
            .await;

        f.poller.tick().await.unwrap();
        assert!(f.tool.calls().await.is_empty());
        assert!(f.processed.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_extraction_is_not_retried() {
        let f = fixture();
        let content = seed_download(f.root.path(), "Broken", &["x.rar"]);
        f.client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "Broken", &content))
            .await;
        f.tool
            .fail_next(ExtractorError::ToolFailed {
                code: Some(2),
                output: "CRC failed".into(),
            })
            .await;

        f.poller.tick().await.unwrap();
        f.poller.tick().await.unwrap();

        // One attempt, no retry: the hash was marked before dispatch.
        assert_eq!(f.tool.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_pause_failure_does_not_block_extraction() {
        let f = fixture();
        let content = seed_download(f.root.path(), "Unpausable", &["x.rar"]);
        f.client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "Unpausable", &content))
            .await;
        f.client
            .fail_next_pause(TorrentClientError::ApiError("pause broken".into()))
            .await;

        f.poller.tick().await.unwrap();
        assert_eq!(f.tool.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_torrent_without_archives_is_consumed_quietly() {
        let f = fixture();
        let content = seed_download(f.root.path(), "PlainVideo", &["movie.mkv"]);
        f.client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "PlainVideo", &content))
            .await;

        f.poller.tick().await.unwrap();
        assert!(f.tool.calls().await.is_empty());
        // Still marked: nothing to do for this torrent, ever.
        assert!(f.processed.read().await.contains("abc"));
    }

    #[tokio::test]
    async fn test_run_fails_fast_on_authentication_error() {
        let f = fixture();
        f.client
            .fail_next_auth(TorrentClientError::AuthenticationFailed("bad creds".into()))
            .await;

        let result = f.poller.run().await;
        assert!(matches!(result, Err(MonitorError::Connection(_))));
    }

    #[tokio::test]
    async fn test_failed_poll_waits_backoff_not_poll_interval() {
        let f = fixture_with_settings(PollerSettings {
            poll_interval: Duration::from_millis(5),
            backoff: Duration::from_millis(400),
        });
        f.client
            .fail_next_list(TorrentClientError::Timeout)
            .await;

        let handle = tokio::spawn(f.poller.run());

        // Well inside the backoff window: only the failed poll has
        // happened. At the normal 5ms interval there would be dozens.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(f.client.list_call_count().await, 1);

        // Once the backoff elapses, polling resumes.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(f.client.list_call_count().await >= 2);

        f.shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropped_shutdown_channel_stops_the_loop() {
        let f = fixture();
        drop(f.shutdown_tx);

        tokio::time::timeout(Duration::from_secs(1), f.poller.run())
            .await
            .expect("loop kept running after shutdown channel closed")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_recovers_from_poll_errors_and_honors_shutdown() {
        let f = fixture();
        let content = seed_download(f.root.path(), "Late", &["x.rar"]);
        f.client
            .fail_next_list(TorrentClientError::Timeout)
            .await;
        f.client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "Late", &content))
            .await;

        let handle = tokio::spawn(f.poller.run());
        // First tick fails and backs off; the next one dispatches.
        tokio::time::sleep(Duration::from_millis(100)).await;
        f.shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(f.tool.calls().await.len(), 1);
    }
}
