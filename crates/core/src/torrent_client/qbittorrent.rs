//! qBittorrent torrent service implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QBittorrentConfig;

use super::{TorrentClient, TorrentClientError, TorrentInfo};

/// qBittorrent WebUI v2 client.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Session marker (refreshed on auth failure; the cookie jar holds the
    /// actual SID).
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.config.host, self.config.port)
    }

    /// Login and mark the session live.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else if e.is_connect() {
                    TorrentClientError::ConnectionFailed(e.to_string())
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            // Session cookie is stored by the cookie jar
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Make an authenticated GET request, retrying once after a re-login if
    /// the session expired.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentClientError::Timeout
            } else {
                TorrentClientError::ApiError(e.to_string())
            }
        })?;

        let status = response.status();
        if status.as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(TorrentClientError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    /// Make an authenticated POST request with form data, retrying once
    /// after a re-login if the session expired.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 403 {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

            if !response.status().is_success() {
                return Err(TorrentClientError::ApiError(format!(
                    "HTTP {}",
                    response.status()
                )));
            }

            return response
                .text()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    progress: f64,
    content_path: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            progress: self.progress,
            content_path: PathBuf::from(self.content_path),
        }
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn authenticate(&self) -> Result<(), TorrentClientError> {
        self.login().await
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let response = self.get("/api/v2/torrents/info").await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(torrents.into_iter().map(|t| t.into_torrent_info()).collect())
    }

    async fn pause_torrents(&self, hashes: &[String]) -> Result<(), TorrentClientError> {
        if hashes.is_empty() {
            return Ok(());
        }
        let joined = hashes
            .iter()
            .map(|h| h.to_lowercase())
            .collect::<Vec<_>>()
            .join("|");
        self.post_form("/api/v2/torrents/pause", &[("hashes", &joined)])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_torrent_list_response() {
        let json = r#"[
            {
                "hash": "ABC123DEF",
                "name": "Some.Release",
                "progress": 1.0,
                "content_path": "/downloads/Some.Release",
                "state": "uploading",
                "size": 123456
            },
            {
                "hash": "fff000",
                "name": "Partial",
                "progress": 0.42,
                "content_path": "/downloads/Partial"
            }
        ]"#;

        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(json).unwrap();
        let infos: Vec<TorrentInfo> = torrents.into_iter().map(|t| t.into_torrent_info()).collect();

        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].hash, "abc123def"); // lowercase
        assert!(infos[0].is_complete());
        assert_eq!(
            infos[0].content_path,
            PathBuf::from("/downloads/Some.Release")
        );
        assert!(!infos[1].is_complete());
    }

    #[test]
    fn test_base_url_from_host_port() {
        let client = QBittorrentClient::new(QBittorrentConfig {
            host: "localhost".into(),
            port: 8080,
            username: "admin".into(),
            password: "secret".into(),
            timeout_secs: 30,
        });
        assert_eq!(client.base_url(), "http://localhost:8080");
    }
}
