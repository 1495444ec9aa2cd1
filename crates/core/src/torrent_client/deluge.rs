//! Deluge torrent client adapter, speaking the Deluge WebUI's JSON-RPC
//! protocol (`/json`, password auth, session cookie).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
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
pub struct DelugeConfig {
    pub url: String,
    pub password: String,
    pub timeout_secs: u32,
}

pub struct DelugeClient {
    client: Client,
    config: DelugeConfig,
    authenticated: Arc<RwLock<bool>>,
    request_id: Arc<std::sync::atomic::AtomicU64>,
}

impl DelugeClient {
    pub fn new(config: DelugeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .expect("failed to build deluge http client");

        Self {
            client,
            config,
            authenticated: Arc::new(RwLock::new(false)),
            request_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
        }
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }

    async fn raw_call(&self, method: &str, params: Value) -> Result<Value, TorrentClientError> {
        let body = json!({ "method": method, "params": params, "id": self.next_id() });

        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else {
                    TorrentClientError::ConnectionFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", response.status())));
        }

        let parsed: Value = response.json().await.map_err(|e| TorrentClientError::ApiError(e.to_string()))?;
        if let Some(error) = parsed.get("error") {
            if !error.is_null() {
                return Err(TorrentClientError::ApiError(error.to_string()));
            }
        }
        Ok(parsed.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        let result = self.raw_call("auth.login", json!([self.config.password])).await?;
        if result.as_bool() == Some(true) {
            debug!("deluge login successful");
            *self.authenticated.write().await = true;
            Ok(())
        } else {
            Err(TorrentClientError::AuthenticationFailed("invalid password".to_string()))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if *self.authenticated.read().await {
            return Ok(());
        }
        self.login().await
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TorrentClientError> {
        self.ensure_authenticated().await?;
        match self.raw_call(method, params.clone()).await {
            Err(TorrentClientError::ApiError(_)) => {
                // Session may have expired server-side; re-authenticate once and retry.
                *self.authenticated.write().await = false;
                self.ensure_authenticated().await?;
                self.raw_call(method, params).await
            }
            other => other,
        }
    }

    async fn find(&self, info_hash: &str) -> Result<Option<Value>, TorrentClientError> {
        let keys = json!(["hash", "progress", "save_path", "label", "trackers"]);
        let filter = json!({ "hash": info_hash.to_ascii_lowercase() });
        let result = self.call("core.get_torrents_status", json!([filter, keys])).await?;
        Ok(result.as_object().and_then(|m| m.values().next().cloned()))
    }
}

#[async_trait]
impl TorrentClient for DelugeClient {
    fn name(&self) -> &str {
        "deluge"
    }

    async fn is_torrent_complete(&self, info_hash: &str) -> Result<bool, TorrentClientError> {
        Ok(self
            .find(info_hash)
            .await?
            .and_then(|t| t.get("progress").and_then(Value::as_f64))
            .is_some_and(|p| p >= 100.0))
    }

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        let keys = json!(["hash", "progress", "save_path", "label", "trackers"]);
        let result = self.call("core.get_torrents_status", json!([{}, keys])).await?;

        let Some(map) = result.as_object() else { return Ok(Vec::new()) };

        Ok(map
            .values()
            .map(|t| {
                let trackers = t
                    .get("trackers")
                    .and_then(Value::as_array)
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|tr| tr.get("url").and_then(Value::as_str))
                            .map(|u| vec![u.to_string()])
                            .collect()
                    })
                    .unwrap_or_default();

                let label = t.get("label").and_then(Value::as_str).filter(|s| !s.is_empty());

                ClientTorrent {
                    info_hash: t.get("hash").and_then(Value::as_str).unwrap_or_default().to_ascii_lowercase(),
                    category: label.map(|s| s.to_string()),
                    tags: label.map(|s| vec![s.to_string()]).unwrap_or_default(),
                    trackers,
                }
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
            Some(t) => {
                let progress = t.get("progress").and_then(Value::as_f64).unwrap_or(0.0);
                if opts.only_completed && progress < 100.0 {
                    return Err(GetDownloadDirError::TorrentNotComplete);
                }
                let save_path = t.get("save_path").and_then(Value::as_str).unwrap_or_default();
                Ok(PathBuf::from(save_path))
            }
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

        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, meta.bytes());
        let mut options = json!({ "seed_mode": true });
        if let Some(dir) = download_dir {
            options["download_location"] = json!(dir);
        }

        let params = json!([format!("{}.torrent", meta.name), encoded, options]);
        match self.call("core.add_torrent_file", params).await {
            Ok(result) if result.is_string() => Ok(InjectOutcome::Success),
            Ok(_) => Ok(InjectOutcome::Failure),
            Err(e) => {
                warn!(error = %e, "deluge injection failed");
                Ok(InjectOutcome::Failure)
            }
        }
    }

    async fn recheck_torrent(&self, info_hash: &str) -> Result<(), TorrentClientError> {
        self.call("core.force_recheck", json!([[info_hash.to_ascii_lowercase()]])).await?;
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), TorrentClientError> {
        self.ensure_authenticated().await
    }
}
