//! qBittorrent torrent client adapter.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::types::{
    ClientTorrent, GetDownloadDirError, GetDownloadDirOptions, InjectOutcome, TorrentClient,
    TorrentClientError,
};
use crate::decision::Decision;
use crate::metafile::Metafile;
use crate::searchee::Searchee;

#[derive(Debug, Clone)]
pub struct QBittorrentConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u32,
}

/// qBittorrent client adapter, implementing the spec §4.J contract over
/// qBittorrent's WebUI API.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    pub fn new(config: QBittorrentConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .expect("failed to build qbittorrent http client");

        Self { client, config, session: Arc::new(RwLock::new(None)) }
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self.client.post(&url).form(&params).send().await.map_err(|e| {
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
            debug!("qbittorrent login successful");
            *self.session.write().await = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed("invalid credentials".to_string()))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        self.login().await
    }

    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url(), endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { TorrentClientError::Timeout } else { TorrentClientError::ApiError(e.to_string()) })?;

        if response.status().as_u16() == 403 {
            warn!("qbittorrent session expired, re-authenticating");
            *self.session.write().await = None;
            self.login().await?;
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
            return response.text().await.map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !response.status().is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", response.status())));
        }
        response.text().await.map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    async fn post_form(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, TorrentClientError> {
        self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url(), endpoint);

        let response = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { TorrentClientError::Timeout } else { TorrentClientError::ApiError(e.to_string()) })?;

        if response.status().as_u16() == 403 {
            *self.session.write().await = None;
            self.login().await?;
            let response = self
                .client
                .post(&url)
                .form(params)
                .send()
                .await
                .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
            return response.text().await.map_err(|e| TorrentClientError::ApiError(e.to_string()));
        }

        if !response.status().is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", response.status())));
        }
        response.text().await.map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    async fn post_multipart(&self, endpoint: &str, form: multipart::Form) -> Result<(), TorrentClientError> {
        self.ensure_authenticated().await?;
        let url = format!("{}{}", self.base_url(), endpoint);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { TorrentClientError::Timeout } else { TorrentClientError::ApiError(e.to_string()) })?;

        if !response.status().is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn find(&self, info_hash: &str) -> Result<Option<QBTorrentInfo>, TorrentClientError> {
        let endpoint = format!("/api/v2/torrents/info?hashes={}", info_hash.to_ascii_lowercase());
        let body = self.get(&endpoint).await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&body)
            .map_err(|e| TorrentClientError::ApiError(format!("failed to parse response: {}", e)))?;
        Ok(torrents.into_iter().next())
    }

    async fn trackers_for(&self, info_hash: &str) -> Vec<Vec<String>> {
        let endpoint = format!("/api/v2/torrents/trackers?hash={}", info_hash.to_ascii_lowercase());
        match self.get(&endpoint).await {
            Ok(body) => {
                let entries: Vec<QBTracker> = serde_json::from_str(&body).unwrap_or_default();
                vec![entries.into_iter().map(|t| t.url).collect()]
            }
            Err(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct QBTorrentInfo {
    hash: String,
    progress: f64,
    save_path: String,
    category: String,
    tags: String,
}

#[derive(Debug, Deserialize)]
struct QBTracker {
    url: String,
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn is_torrent_complete(&self, info_hash: &str) -> Result<bool, TorrentClientError> {
        Ok(self.find(info_hash).await?.is_some_and(|t| t.progress >= 1.0))
    }

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        let body = self.get("/api/v2/torrents/info").await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&body)
            .map_err(|e| TorrentClientError::ApiError(format!("failed to parse response: {}", e)))?;

        let trackers = join_all(torrents.iter().map(|t| self.trackers_for(&t.hash))).await;

        Ok(torrents
            .into_iter()
            .zip(trackers)
            .map(|(t, trackers)| ClientTorrent {
                info_hash: t.hash.to_ascii_lowercase(),
                category: if t.category.is_empty() { None } else { Some(t.category) },
                tags: if t.tags.is_empty() {
                    Vec::new()
                } else {
                    t.tags.split(", ").map(|s| s.to_string()).collect()
                },
                trackers,
            })
            .collect())
    }

    async fn get_download_dir(
        &self,
        meta: &Metafile,
        opts: GetDownloadDirOptions,
    ) -> Result<PathBuf, GetDownloadDirError> {
        let found = self
            .find(&meta.info_hash)
            .await
            .map_err(|e| GetDownloadDirError::UnknownError(e.to_string()))?;

        match found {
            None => Err(GetDownloadDirError::NotFound),
            Some(t) if opts.only_completed && t.progress < 1.0 => {
                Err(GetDownloadDirError::TorrentNotComplete)
            }
            Some(t) => Ok(PathBuf::from(t.save_path)),
        }
    }

    async fn inject(
        &self,
        meta: &Metafile,
        searchee: &Searchee,
        _decision: &Decision,
        path: Option<&Path>,
    ) -> Result<InjectOutcome, TorrentClientError> {
        if self.find(&meta.info_hash).await?.is_some() {
            return Ok(InjectOutcome::AlreadyExists);
        }

        let save_path = path.map(|p| p.to_string_lossy().into_owned()).or_else(|| {
            if let crate::searchee::SearcheeOrigin::Client { save_path, .. } = &searchee.origin {
                Some(save_path.clone())
            } else {
                None
            }
        });

        let file_part = multipart::Part::bytes(meta.bytes())
            .file_name(format!("{}.torrent", meta.name))
            .mime_str("application/x-bittorrent")
            .map_err(|e| TorrentClientError::Internal(e.to_string()))?;

        let mut form = multipart::Form::new().part("torrents", file_part).text("skip_checking", "true");
        if let Some(save_path) = save_path {
            form = form.text("savepath", save_path).text("autoTMM", "false");
        }

        match self.post_multipart("/api/v2/torrents/add", form).await {
            Ok(()) => Ok(InjectOutcome::Success),
            Err(e) => {
                warn!(error = %e, "qbittorrent injection failed");
                Ok(InjectOutcome::Failure)
            }
        }
    }

    async fn recheck_torrent(&self, info_hash: &str) -> Result<(), TorrentClientError> {
        self.post_form("/api/v2/torrents/recheck", &[("hashes", &info_hash.to_ascii_lowercase())]).await?;
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), TorrentClientError> {
        self.ensure_authenticated().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_split_on_comma_space() {
        let raw = "a, b, c";
        let tags: Vec<&str> = raw.split(", ").collect();
        assert_eq!(tags, vec!["a", "b", "c"]);
    }
}
