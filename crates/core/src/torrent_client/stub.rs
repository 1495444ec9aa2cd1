use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::types::{
    ClientTorrent, GetDownloadDirError, GetDownloadDirOptions, InjectOutcome, TorrentClient,
    TorrentClientError,
};
use crate::decision::Decision;
use crate::metafile::Metafile;
use crate::searchee::Searchee;

/// "Save only" adapter, selected when no `*RpcUrl` is configured (spec
/// §4.J, §9 "Client-adapter polymorphism"): it reports no existing
/// torrents and never injects, so the pipeline falls back to writing the
/// artifact to `outputDir` without contacting a client.
pub struct StubClient;

impl StubClient {
    pub fn new() -> Self {
        StubClient
    }
}

impl Default for StubClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TorrentClient for StubClient {
    fn name(&self) -> &str {
        "save-only"
    }

    async fn is_torrent_complete(&self, _info_hash: &str) -> Result<bool, TorrentClientError> {
        Ok(false)
    }

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError> {
        Ok(Vec::new())
    }

    async fn get_download_dir(
        &self,
        _meta: &Metafile,
        _opts: GetDownloadDirOptions,
    ) -> Result<PathBuf, GetDownloadDirError> {
        Err(GetDownloadDirError::NotFound)
    }

    async fn inject(
        &self,
        _meta: &Metafile,
        _searchee: &Searchee,
        _decision: &Decision,
        _path: Option<&Path>,
    ) -> Result<InjectOutcome, TorrentClientError> {
        Ok(InjectOutcome::Success)
    }

    async fn recheck_torrent(&self, _info_hash: &str) -> Result<(), TorrentClientError> {
        Ok(())
    }

    async fn validate_config(&self) -> Result<(), TorrentClientError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_no_torrents_and_always_succeeds() {
        let client = StubClient::new();
        assert!(client.get_all_torrents().await.unwrap().is_empty());
        assert!(!client.is_torrent_complete("abc").await.unwrap());
        client.validate_config().await.unwrap();
    }
}
