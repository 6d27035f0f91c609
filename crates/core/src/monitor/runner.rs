//! Monitor lifecycle runner.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::events::EventBus;
use crate::extractor::{ExtractionOrchestrator, ExtractionTool};
use crate::torrent_client::TorrentClient;

use super::poller::CompletionPoller;
use super::types::{MonitorError, PollerSettings};

/// Owns the monitoring task: start, advisory stop, bounded shutdown.
///
/// The processed set lives here, not in the poller, so stopping and
/// restarting monitoring within one process does not re-extract anything.
pub struct Monitor<T: ExtractionTool + 'static> {
    client: Arc<dyn TorrentClient>,
    orchestrator: Arc<ExtractionOrchestrator<T>>,
    events: EventBus,
    monitor_root: PathBuf,
    settings: PollerSettings,
    processed: Arc<RwLock<HashSet<String>>>,
    running: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<Result<(), MonitorError>>>>,
}

impl<T: ExtractionTool + 'static> Monitor<T> {
    pub fn new(
        client: Arc<dyn TorrentClient>,
        orchestrator: Arc<ExtractionOrchestrator<T>>,
        events: EventBus,
        monitor_root: PathBuf,
        settings: PollerSettings,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            client,
            orchestrator,
            events,
            monitor_root,
            settings,
            processed: Arc::new(RwLock::new(HashSet::new())),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// True while a monitoring task is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns a fresh monitoring run. Fails if one is already active.
    pub async fn start(&self) -> Result<(), MonitorError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Monitor already running");
            return Err(MonitorError::AlreadyRunning);
        }

        info!("Starting monitor on {}", self.monitor_root.display());
        self.shutdown_tx.send_replace(false);

        let poller = CompletionPoller::new(
            Arc::clone(&self.client),
            Arc::clone(&self.orchestrator),
            self.events.clone(),
            self.monitor_root.clone(),
            Arc::clone(&self.processed),
            self.settings,
            self.shutdown_tx.subscribe(),
        );
        let running = Arc::clone(&self.running);
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            let result = poller.run().await;
            running.store(false, Ordering::SeqCst);
            events.status("Stopped");
            result
        });
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    /// Signals the loop to stop after its current tick. Does not wait.
    pub fn stop(&self) {
        info!("Stopping monitor");
        self.shutdown_tx.send_replace(true);
    }

    /// Stops the loop and waits up to `grace` for the task to finish,
    /// abandoning it afterwards.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), MonitorError> {
        self.stop();
        let Some(handle) = self.task.lock().await.take() else {
            return Ok(());
        };
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(result)) => {
                // A connection failure already ended the run; shutdown
                // itself still succeeded.
                if let Err(e) = result {
                    warn!("Monitor run had ended with error: {}", e);
                }
                Ok(())
            }
            Ok(Err(join_err)) => {
                warn!("Monitor task panicked: {}", join_err);
                Ok(())
            }
            Err(_) => {
                warn!("Monitor task did not stop within {:?}, abandoning it", grace);
                Err(MonitorError::ShutdownTimeout {
                    grace_secs: grace.as_secs(),
                })
            }
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
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn monitor(root: &TempDir) -> (Monitor<MockExtractionTool>, Arc<MockTorrentClient>, MockExtractionTool, EventReceiver) {
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
        let settings = PollerSettings {
            poll_interval: Duration::from_millis(5),
            backoff: Duration::from_millis(10),
        };
        let m = Monitor::new(
            client.clone() as Arc<dyn TorrentClient>,
            orchestrator,
            events,
            root.path().to_path_buf(),
            settings,
        );
        (m, client, tool, rx)
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let root = tempdir().unwrap();
        let (monitor, _client, _tool, _rx) = monitor(&root);

        monitor.start().await.unwrap();
        assert!(monitor.is_running());
        assert!(matches!(
            monitor.start().await,
            Err(MonitorError::AlreadyRunning)
        ));
        monitor.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_restart_keeps_processed_set() {
        let root = tempdir().unwrap();
        let (monitor, client, tool, _rx) = monitor(&root);

        let content = root.path().join("MyDownload");
        fs::create_dir(&content).unwrap();
        fs::write(content.join("x.rar"), b"bytes").unwrap();
        client
            .add_torrent(MockTorrentClient::completed_torrent("abc", "MyDownload", &content))
            .await;

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(tool.calls().await.len(), 1);

        // Second run in the same process: nothing to do.
        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        monitor.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(tool.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_auth_failure_ends_run_but_allows_restart() {
        let root = tempdir().unwrap();
        let (monitor, client, _tool, _rx) = monitor(&root);
        client
            .fail_next_auth(crate::torrent_client::TorrentClientError::AuthenticationFailed(
                "bad creds".into(),
            ))
            .await;

        monitor.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!monitor.is_running());

        // The failed run released the slot.
        monitor.start().await.unwrap();
        monitor.shutdown(Duration::from_secs(1)).await.unwrap();
    }
}
