//! Torrent service abstraction.
//!
//! The `TorrentClient` trait covers the three operations the monitor needs:
//! authenticate once, fetch the full torrent list, pause items about to be
//! processed. qBittorrent's WebUI v2 API is the shipped backend.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::{TorrentClient, TorrentClientError, TorrentInfo};
