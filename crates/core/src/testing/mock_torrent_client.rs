//! Mock torrent client for pipeline and CLI tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::decision::Decision;
use crate::metafile::Metafile;
use crate::searchee::Searchee;
use crate::torrent_client::{
    ClientTorrent, GetDownloadDirError, GetDownloadDirOptions, InjectOutcome, TorrentClient,
    TorrentClientError,
};

/// A recorded `inject` call, for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInject {
    pub info_hash: String,
    pub searchee_name: String,
    pub path: Option<PathBuf>,
}

/// Controllable [`TorrentClient`] for tests: tracks injections, lets tests
/// preload known torrents and download directories, and can be made to fail
/// the next call.
#[derive(Debug, Default)]
pub struct MockTorrentClient {
    torrents: Arc<RwLock<Vec<ClientTorrent>>>,
    download_dirs: Arc<RwLock<HashMap<String, PathBuf>>>,
    complete: Arc<RwLock<HashMap<String, bool>>>,
    injected: Arc<RwLock<Vec<RecordedInject>>>,
    next_error: Arc<RwLock<Option<String>>>,
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_known_torrent(&self, torrent: ClientTorrent) {
        self.torrents.write().await.push(torrent);
    }

    pub async fn set_download_dir(&self, info_hash: &str, dir: PathBuf) {
        self.download_dirs.write().await.insert(info_hash.to_lowercase(), dir);
    }

    pub async fn set_complete(&self, info_hash: &str, complete: bool) {
        self.complete.write().await.insert(info_hash.to_lowercase(), complete);
    }

    pub async fn set_next_error(&self, message: impl Into<String>) {
        *self.next_error.write().await = Some(message.into());
    }

    pub async fn injected(&self) -> Vec<RecordedInject> {
        self.injected.read().await.clone()
    }

    async fn take_error(&self) -> Option<String> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_torrent_complete(&self, info_hash: &str) -> Result<bool, TorrentClientError> {
        if let Some(msg) = self.take_error().await {
            return Err(TorrentClientError::Internal(msg));
        }
        Ok(self
            .complete
            .read()
            .await
            .get(&info_hash.to_lowercase())
            .copied()
            .unwrap_or(false))
    }

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        if let Some(msg) = self.take_error().await {
            return Err(TorrentClientError::Internal(msg));
        }
        Ok(self.torrents.read().await.clone())
    }

    async fn get_download_dir(
        &self,
        meta: &Metafile,
        _opts: GetDownloadDirOptions,
    ) -> Result<PathBuf, GetDownloadDirError> {
        self.download_dirs
            .read()
            .await
            .get(&meta.info_hash.to_lowercase())
            .cloned()
            .ok_or(GetDownloadDirError::NotFound)
    }

    async fn inject(
        &self,
        meta: &Metafile,
        searchee: &Searchee,
        _decision: &Decision,
        path: Option<&Path>,
    ) -> Result<InjectOutcome, TorrentClientError> {
        if let Some(msg) = self.take_error().await {
            return Err(TorrentClientError::Internal(msg));
        }
        self.injected.write().await.push(RecordedInject {
            info_hash: meta.info_hash.clone(),
            searchee_name: searchee.name.clone(),
            path: path.map(Path::to_path_buf),
        });
        Ok(InjectOutcome::Success)
    }

    async fn recheck_torrent(&self, _info_hash: &str) -> Result<(), TorrentClientError> {
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), TorrentClientError> {
        if let Some(msg) = self.take_error().await {
            return Err(TorrentClientError::Internal(msg));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_injections() {
        let client = MockTorrentClient::new();
        let meta = Metafile {
            info_hash: "abc123".into(),
            announce: None,
            announce_list: Vec::new(),
            name: "foo".into(),
            files: Vec::new(),
            piece_length: 0,
            pieces: Vec::new(),
            private: false,
            raw: Vec::new(),
        };
        let searchee = Searchee::new(
            "foo",
            vec![crate::searchee::SearcheeFile { relative_path: "foo.mkv".into(), size: 1 }],
            None,
            crate::searchee::SearcheeOrigin::Data { root: "/tmp/foo".into() },
        )
        .unwrap();
        let decision = Decision {
            searchee_name: "foo".into(),
            candidate_guid: "guid-1".into(),
            indexer_id: 1,
            verdict: crate::decision::Verdict::Match,
            info_hash: Some("abc123".into()),
            first_seen: chrono::Utc::now(),
            last_seen: chrono::Utc::now(),
            fuzzy_size_factor: None,
        };

        client.inject(&meta, &searchee, &decision, None).await.unwrap();
        let recorded = client.injected().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].info_hash, "abc123");
    }

    #[tokio::test]
    async fn returns_configured_error_once() {
        let client = MockTorrentClient::new();
        client.set_next_error("boom").await;
        assert!(client.validate_config().await.is_err());
        assert!(client.validate_config().await.is_ok());
    }

    #[tokio::test]
    async fn download_dir_lookup_by_info_hash() {
        let client = MockTorrentClient::new();
        client.set_download_dir("abc123", PathBuf::from("/downloads/foo")).await;
        let meta = Metafile {
            info_hash: "ABC123".into(),
            announce: None,
            announce_list: Vec::new(),
            name: "foo".into(),
            files: Vec::new(),
            piece_length: 0,
            pieces: Vec::new(),
            private: false,
            raw: Vec::new(),
        };
        let dir = client.get_download_dir(&meta, GetDownloadDirOptions::default()).await.unwrap();
        assert_eq!(dir, PathBuf::from("/downloads/foo"));
    }
}
