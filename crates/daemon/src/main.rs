use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unpackd_core::{
    load_config, validate_config, DestinationPolicy, EventBus, EventReceiver,
    ExtractionOrchestrator, HistoryStore, Monitor, PollerSettings, QBittorrentClient,
    SanitizedConfig, SevenZipTool, TorrentClient, UnpackEvent,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long shutdown waits for the monitoring task to finish.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("unpackd {} starting", VERSION);

    // Determine config path
    let config_path = std::env::var("UNPACKD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    // Wire up the core
    let (events, event_rx) = EventBus::channel();

    let history = HistoryStore::new(&config.general.history_path);
    let previous = history.load_all().unwrap_or_default();
    if !previous.is_empty() {
        info!("Loaded {} prior extraction records", previous.len());
    }

    let tool = SevenZipTool::new(&config.folders.tool_path, config.general.tool_timeout_secs);
    let destination = if config.general.create_subfolder {
        DestinationPolicy::Subfolder
    } else {
        DestinationPolicy::Flat
    };
    let orchestrator = Arc::new(ExtractionOrchestrator::new(
        tool,
        history,
        events.clone(),
        destination,
        config.general.delete_on_success,
    ));

    let client: Arc<dyn TorrentClient> =
        Arc::new(QBittorrentClient::new(config.qbittorrent.clone()));

    let monitor = Monitor::new(
        client,
        orchestrator,
        events.clone(),
        config.folders.monitor_path.clone(),
        PollerSettings::from_config(&config.monitor),
    );

    // Drain events to the log for the lifetime of the process
    let drain_handle = tokio::spawn(drain_events(event_rx));

    if config.general.start_on_launch {
        monitor.start().await.context("Failed to start monitor")?;
    } else {
        warn!("general.start_on_launch is false; staying idle until shutdown");
    }

    // Run until Ctrl+C or SIGTERM
    shutdown_signal().await;
    info!("Shutdown signal received");

    if let Err(e) = monitor.shutdown(SHUTDOWN_GRACE).await {
        warn!("Monitor shutdown incomplete: {}", e);
    }

    // Close every producer so the drain task sees end-of-channel.
    drop(monitor);
    drop(events);
    if tokio::time::timeout(SHUTDOWN_GRACE, drain_handle)
        .await
        .is_err()
    {
        warn!("Event drain did not finish in time");
    }

    info!("unpackd stopped");
    Ok(())
}

/// Forwards core events to the log, one line each.
async fn drain_events(mut rx: EventReceiver) {
    while let Some(envelope) = rx.recv().await {
        match envelope.event {
            UnpackEvent::LogLine(line) => info!("{}", line),
            UnpackEvent::StatusChanged(status) => info!("Status: {}", status),
            UnpackEvent::ProgressStart => info!("Extraction in progress"),
            UnpackEvent::ProgressStop => info!("Extraction finished"),
            UnpackEvent::ExtractionSucceeded { name, path } => {
                info!("Extracted '{}' to {}", name, path.display());
            }
            UnpackEvent::ExtractionFailed { name, path } => {
                warn!("Extraction of '{}' failed (destination {})", name, path.display());
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
