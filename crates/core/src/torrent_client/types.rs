//! Client adapter contract (spec §4.J): the capability interface every
//! concrete torrent-client backend implements, plus the stub used when no
//! client is configured.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decision::Decision;
use crate::metafile::Metafile;
use crate::searchee::Searchee;

#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("api error: {0}")]
    ApiError(String),
    #[error("request timeout")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
}

/// One torrent as reported by the active client, used to build
/// [`crate::searchee::SearcheeOrigin::Client`] searchees and to populate
/// the matcher's `knownInfoHashes` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientTorrent {
    pub info_hash: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Announce URLs, grouped by tier as reported by the client.
    pub trackers: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetDownloadDirOptions {
    pub only_completed: bool,
}

#[derive(Debug, Error)]
pub enum GetDownloadDirError {
    #[error("torrent not found in client")]
    NotFound,
    #[error("torrent is not yet complete")]
    TorrentNotComplete,
    #[error("{0}")]
    UnknownError(String),
}

/// Outcome of an injection attempt (spec §4.J).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InjectOutcome {
    Success,
    AlreadyExists,
    TorrentNotComplete,
    Failure,
}

/// The capability interface every torrent-client backend implements.
/// Exactly one implementation is active per process (spec §4.J, §9
/// "Client-adapter polymorphism").
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    async fn is_torrent_complete(&self, info_hash: &str) -> Result<bool, TorrentClientError>;

    async fn get_all_torrents(&self) -> Result<Vec<ClientTorrent>, TorrentClientError>;

    /// Resolves the on-disk download directory for `meta`'s infohash, so
    /// the linker can locate the searchee's payload.
    async fn get_download_dir(
        &self,
        meta: &Metafile,
        opts: GetDownloadDirOptions,
    ) -> Result<PathBuf, GetDownloadDirError>;

    /// Injects `meta` as a cross-seed of `searchee`. `path` overrides the
    /// save path (used when the searchee is data-origin and was linked
    /// into `linkDir` rather than reusing the client's existing download
    /// directory).
    async fn inject(
        &self,
        meta: &Metafile,
        searchee: &Searchee,
        decision: &Decision,
        path: Option<&Path>,
    ) -> Result<InjectOutcome, TorrentClientError>;

    async fn recheck_torrent(&self, info_hash: &str) -> Result<(), TorrentClientError>;

    /// Startup probe: verifies the adapter can reach its backend and is
    /// configured correctly (spec §7 "Startup validation").
    async fn validate_config(&self) -> Result<(), TorrentClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_outcome_serializes_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&InjectOutcome::AlreadyExists).unwrap(), "\"ALREADY_EXISTS\"");
        assert_eq!(serde_json::to_string(&InjectOutcome::TorrentNotComplete).unwrap(), "\"TORRENT_NOT_COMPLETE\"");
    }
}
