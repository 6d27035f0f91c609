//! Event channel from background work to the presentation layer.
//!
//! Background producers (poller, orchestrator) publish tagged events; exactly
//! one consumer drains them in arrival order. The channel is unbounded so a
//! slow consumer never stalls extraction.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// An event published by background work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackEvent {
    /// A formatted log line for the activity view.
    LogLine(String),
    /// The status text changed.
    StatusChanged(String),
    /// An extraction started; show indeterminate progress.
    ProgressStart,
    /// The extraction finished; hide progress.
    ProgressStop,
    /// An archive set was extracted successfully.
    ExtractionSucceeded { name: String, path: PathBuf },
    /// An extraction attempt failed.
    ExtractionFailed { name: String, path: PathBuf },
}

/// Envelope wrapping an event with its emission time.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: UnpackEvent,
}

/// Receiving half of the event channel; owned by the single consumer.
pub type EventReceiver = mpsc::UnboundedReceiver<EventEnvelope>;

/// Producer handle for the event channel.
///
/// Cheaply cloneable and shareable across tasks. Sends never block; if the
/// consumer is gone the event is dropped and the failure logged.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl EventBus {
    /// Creates a bus and its single consumer end.
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publishes an event.
    pub fn emit(&self, event: UnpackEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if self.tx.send(envelope).is_err() {
            tracing::debug!("Event dropped: consumer is gone");
        }
    }

    /// Publishes a log line.
    pub fn log(&self, line: impl Into<String>) {
        self.emit(UnpackEvent::LogLine(line.into()));
    }

    /// Publishes a status text change.
    pub fn status(&self, text: impl Into<String>) {
        self.emit(UnpackEvent::StatusChanged(text.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (bus, mut rx) = EventBus::channel();
        bus.status("Extracting: x.rar");
        bus.emit(UnpackEvent::ProgressStart);
        bus.emit(UnpackEvent::ProgressStop);
        bus.status("Monitoring...");

        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(rx.recv().await.unwrap().event);
        }
        assert_eq!(
            seen,
            vec![
                UnpackEvent::StatusChanged("Extracting: x.rar".into()),
                UnpackEvent::ProgressStart,
                UnpackEvent::ProgressStop,
                UnpackEvent::StatusChanged("Monitoring...".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_many_producers_single_consumer() {
        let (bus, mut rx) = EventBus::channel();
        let other = bus.clone();
        bus.log("from a");
        other.log("from b");

        assert_eq!(rx.recv().await.unwrap().event, UnpackEvent::LogLine("from a".into()));
        assert_eq!(rx.recv().await.unwrap().event, UnpackEvent::LogLine("from b".into()));
    }

    #[test]
    fn test_emit_after_consumer_dropped_does_not_panic() {
        let (bus, rx) = EventBus::channel();
        drop(rx);
        bus.emit(UnpackEvent::ProgressStart);
    }

    #[test]
    fn test_envelope_timestamped() {
        let (bus, mut rx) = EventBus::channel();
        let before = Utc::now();
        bus.emit(UnpackEvent::ProgressStart);
        let after = Utc::now();

        let envelope = rx.try_recv().unwrap();
        assert!(envelope.timestamp >= before && envelope.timestamp <= after);
    }
}
