use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indexer::IndexerOutcome;

/// Torznab search mode, selected from a searchee's name and intersected
/// with the indexer's advertised capabilities (spec §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    TvSearch,
    Movie,
    Music,
    Book,
    Search,
}

impl QueryKind {
    pub fn as_param(&self) -> &'static str {
        match self {
            QueryKind::TvSearch => "tvsearch",
            QueryKind::Movie => "movie",
            QueryKind::Music => "music",
            QueryKind::Book => "book",
            QueryKind::Search => "search",
        }
    }
}

/// A concrete query to run against one indexer.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub indexer_id: i64,
    pub kind: QueryKind,
    pub terms: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

/// One item of a Torznab RSS response (spec §4.E, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorznabItem {
    pub title: String,
    pub guid: String,
    pub link: String,
    pub size: u64,
    pub pub_date: Option<DateTime<Utc>>,
    pub info_hash: Option<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TorznabError {
    #[error("request error: {0}")]
    Request(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid Torznab XML: {0}")]
    InvalidXml(String),
    #[error("rate limited")]
    RateLimited,
    #[error("invalid api key")]
    InvalidAuth,
    #[error("no download link available")]
    NoDownloadLink,
}

/// Classifies an HTTP status into the health outcome shared by the
/// indexer registry's test-connection and the Torznab client's request
/// path (spec §4.C, §4.E): 401 → auth failure, 429 → rate limited, 2xx →
/// success, anything else → transient.
pub fn classify_status(status: u16) -> IndexerOutcome {
    match status {
        401 => IndexerOutcome::AuthFailed,
        429 => IndexerOutcome::RateLimited,
        200..=299 => IndexerOutcome::Success,
        _ => IndexerOutcome::Transient,
    }
}
