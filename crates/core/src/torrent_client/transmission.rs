//! Transmission torrent client adapter, speaking Transmission's JSON-RPC
//! protocol (session-id handshake over `/transmission/rpc`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::warn;

use super::types::{
    ClientTorrent, GetDownloadDirError, GetDownloadDirOptions, InjectOutcome, TorrentClient,
    TorrentClientError,
};
use crate::decision::Decision;
use crate::metafile::Metafile;
use crate::searchee::Searchee;

#[derive(Debug, Clone)]
pub struct TransmissionConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: u32,
}

pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    session_id: Arc<RwLock<Option<String>>>,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize, Default)]
struct TrTorrent {
    #[serde(rename = "hashString")]
    hash_string: String,
    #[serde(rename = "percentDone")]
    percent_done: f64,
    #[serde(rename = "downloadDir")]
    download_dir: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    trackers: Vec<TrTracker>,
}

#[derive(Debug, Deserialize, Default)]
struct TrTracker {
    announce: String,
}

impl TransmissionClient {
    pub fn new(config: TransmissionConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("failed to build transmission http client");
        Self { client, config, session_id: Arc::new(RwLock::new(None)) }
    }

    async fn call(&self, method: &str, arguments: Value) -> Result<Value, TorrentClientError> {
        let body = RpcRequest { method, arguments };
        let session_id = self.session_id.read().await.clone();

        let mut request = self.client.post(&self.config.url).json(&body);
        if let Some(id) = &session_id {
            request = request.header("X-Transmission-Session-Id", id);
        }
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TorrentClientError::Timeout
            } else {
                TorrentClientError::ConnectionFailed(e.to_string())
            }
        })?;

        if response.status().as_u16() == 409 {
            let new_id = response
                .headers()
                .get("X-Transmission-Session-Id")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            *self.session_id.write().await = new_id;
            return Box::pin(self.call(method, body.arguments)).await;
        }

        if response.status().as_u16() == 401 {
            return Err(TorrentClientError::AuthenticationFailed("invalid credentials".to_string()));
        }
        if !response.status().is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", response.status())));
        }

        let parsed: RpcResponse =
            response.json().await.map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        if parsed.result != "success" {
            return Err(TorrentClientError::ApiError(parsed.result));
        }
        Ok(parsed.arguments)
    }

    async fn find(&self, info_hash: &str) -> Result<Option<TrTorrent>, TorrentClientError> {
        let args = json!({
            "ids": [info_hash.to_ascii_lowercase()],
            "fields": ["hashString", "percentDone", "downloadDir", "labels", "trackers"],
        });
        let result = self.call("torrent-get", args).await?;
        let torrents: Vec<TrTorrent> = serde_json::from_value(result["torrents"].clone())
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        Ok(torrents.into_iter().next())
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn is_torrent_complete(&self, info_hash: &str) -> Result<bool, TorrentClientError> {
        Ok(self.find(info_hash).await?.is_some_and(|t| t.percent_done >= 1.0))
    }

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        let args = json!({ "fields": ["hashString", "percentDone", "downloadDir", "labels", "trackers"] });
        let result = self.call("torrent-get", args).await?;
        let torrents: Vec<TrTorrent> = serde_json::from_value(result["torrents"].clone())
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        Ok(torrents
            .into_iter()
            .map(|t| ClientTorrent {
                info_hash: t.hash_string.to_ascii_lowercase(),
                category: t.labels.first().cloned(),
                tags: t.labels,
                trackers: t.trackers.into_iter().map(|tr| vec![tr.announce]).collect(),
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
            Some(t) if opts.only_completed && t.percent_done < 1.0 => {
                Err(GetDownloadDirError::TorrentNotComplete)
            }
            Some(t) => Ok(PathBuf::from(t.download_dir)),
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

        let download_dir = path.map(|p| p.to_string_lossy().into_owned()).or_else(|| {
            if let crate::searchee::SearcheeOrigin::Client { save_path, .. } = &searchee.origin {
                Some(save_path.clone())
            } else {
                None
            }
        });

        let encoded = base64::engine::general_purpose::STANDARD.encode(meta.bytes());
        let mut args = json!({
            "metainfo": encoded,
            "paused": false,
        });
        if let Some(dir) = download_dir {
            args["download-dir"] = json!(dir);
        }

        match self.call("torrent-add", args).await {
            Ok(result) => {
                if result.get("torrent-duplicate").is_some() {
                    Ok(InjectOutcome::AlreadyExists)
                } else {
                    Ok(InjectOutcome::Success)
                }
            }
            Err(e) => {
                warn!(error = %e, "transmission injection failed");
                Ok(InjectOutcome::Failure)
            }
        }
    }

    async fn recheck_torrent(&self, info_hash: &str) -> Result<(), TorrentClientError> {
        self.call("torrent-verify", json!({ "ids": [info_hash.to_ascii_lowercase()] })).await?;
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), TorrentClientError> {
        self.call("session-get", json!({})).await.map(|_| ())
    }
}
