use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub qbittorrent: QBittorrentConfig,
    pub folders: FoldersConfig,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// qBittorrent WebUI connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QBittorrentConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u32 {
    30
}

/// Paths the core operates on
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoldersConfig {
    /// Root under which completed downloads are picked up. Torrents whose
    /// content lies outside this path are ignored.
    pub monitor_path: PathBuf,
    /// Path to the extraction tool binary (7z or compatible).
    pub tool_path: PathBuf,
}

/// Behavioral options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Delete every archive part after a successful extraction.
    #[serde(default)]
    pub delete_on_success: bool,
    /// Extract into a per-download subfolder instead of alongside the parts.
    #[serde(default = "default_true")]
    pub create_subfolder: bool,
    /// Start monitoring as soon as the daemon launches.
    #[serde(default)]
    pub start_on_launch: bool,
    /// Kill the extraction tool and record FAILURE after this many seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    /// Extraction history log file.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            delete_on_success: false,
            create_subfolder: true,
            start_on_launch: false,
            tool_timeout_secs: default_tool_timeout(),
            history_path: default_history_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tool_timeout() -> u64 {
    3600
}

fn default_history_path() -> PathBuf {
    PathBuf::from("extractions.log")
}

/// Polling loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    /// Normal tick interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Wait after a failed tick, instead of the normal interval.
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            backoff_secs: default_backoff(),
        }
    }
}

fn default_poll_interval() -> u64 {
    15
}

fn default_backoff() -> u64 {
    60
}

/// Sanitized config for display/logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub qbittorrent: SanitizedQBittorrentConfig,
    pub folders: FoldersConfig,
    pub general: GeneralConfig,
    pub monitor: MonitorConfig,
}

/// Sanitized qBittorrent config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQBittorrentConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            qbittorrent: SanitizedQBittorrentConfig {
                host: config.qbittorrent.host.clone(),
                port: config.qbittorrent.port,
                username: config.qbittorrent.username.clone(),
                password_configured: !config.qbittorrent.password.is_empty(),
                timeout_secs: config.qbittorrent.timeout_secs,
            },
            folders: config.folders.clone(),
            general: config.general.clone(),
            monitor: config.monitor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[qbittorrent]
host = "127.0.0.1"
port = 9090
username = "admin"
password = "hunter2"

[folders]
monitor_path = "/downloads"
tool_path = "/usr/bin/7z"

[general]
delete_on_success = true
create_subfolder = false

[monitor]
poll_interval_secs = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.qbittorrent.host, "127.0.0.1");
        assert_eq!(config.qbittorrent.port, 9090);
        assert!(config.general.delete_on_success);
        assert!(!config.general.create_subfolder);
        assert_eq!(config.monitor.poll_interval_secs, 5);
        assert_eq!(config.monitor.backoff_secs, 60);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[qbittorrent]

[folders]
monitor_path = "/downloads"
tool_path = "/usr/bin/7z"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.qbittorrent.host, "localhost");
        assert_eq!(config.qbittorrent.port, 8080);
        assert!(!config.general.delete_on_success);
        assert!(config.general.create_subfolder);
        assert!(!config.general.start_on_launch);
        assert_eq!(config.general.tool_timeout_secs, 3600);
        assert_eq!(config.monitor.poll_interval_secs, 15);
    }

    #[test]
    fn test_deserialize_missing_folders_fails() {
        let toml = r#"
[qbittorrent]
host = "localhost"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_sanitized_config_redacts_password() {
        let toml = r#"
[qbittorrent]
password = "hunter2"

[folders]
monitor_path = "/downloads"
tool_path = "/usr/bin/7z"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.qbittorrent.password_configured);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
