pub mod archive;
pub mod config;
pub mod events;
pub mod extractor;
pub mod history;
pub mod monitor;
pub mod testing;
pub mod torrent_client;

pub use archive::{ArchivePart, ArchiveSet};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use events::{EventBus, EventEnvelope, EventReceiver, UnpackEvent};
pub use extractor::{
    DestinationPolicy, ExtractionOrchestrator, ExtractionTool, ExtractorError, SevenZipTool,
};
pub use history::{
    DeleteSummary, ExtractionOutcome, ExtractionRecord, HistoryError, HistoryStore,
};
pub use monitor::{Monitor, MonitorError, MonitorState, PollerSettings};
pub use torrent_client::{QBittorrentClient, TorrentClient, TorrentClientError, TorrentInfo};
