use std::path::PathBuf;
use std::time::Duration;

use crate::config::Action;
use crate::linker::LinkType;
use crate::matcher::MatchPolicy;
use serde::Serialize;
use thiserror::Error;

/// Snapshot of the config fields the pipeline needs, resolved once at
/// startup (spec §4.H, §9 "Runtime config as global").
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub policy: MatchPolicy,
    pub output_dir: PathBuf,
    pub action: Action,
    pub link_dir: Option<PathBuf>,
    pub link_type: LinkType,
    pub flat_linking: bool,
    pub delay: Duration,
    pub search_limit: u32,
    pub exclude_older: Option<Duration>,
    pub exclude_recent_search: Option<Duration>,
    /// Maximum number of searchees processed concurrently (spec §5: design
    /// default `min(4, active_indexers)`).
    pub worker_pool: usize,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("decision store error: {0}")]
    Decision(#[from] crate::decision::DecisionError),
    #[error("indexer store error: {0}")]
    Indexer(#[from] crate::indexer::IndexerError),
    #[error("torznab error: {0}")]
    Torznab(#[from] crate::torznab::TorznabError),
    #[error("client adapter error: {0}")]
    Client(#[from] crate::torrent_client::TorrentClientError),
    #[error("linker error: {0}")]
    Link(#[from] crate::linker::LinkError),
    #[error("io error writing artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Db(#[from] crate::db::DbError),
}

/// What happened to one (searchee, candidate) pair, for pass summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
    /// A cached decision already existed; nothing was re-evaluated.
    Cached,
    /// A preliminary or full-tree rejection was recorded.
    Rejected,
    /// A MATCH-family verdict was recorded (and the artifact written).
    Matched,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkSearchSummary {
    pub searchees_processed: usize,
    pub candidates_matched: usize,
    pub candidates_rejected: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RssScanSummary {
    pub indexers_scanned: usize,
    pub items_processed: usize,
    pub candidates_matched: usize,
    pub errors: usize,
}
