use async_trait::async_trait;
use thiserror::Error;

use super::types::{Indexer, IndexerCaps, IndexerOutcome, NewIndexer};

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),
    #[error("indexer {0} not found")]
    NotFound(i64),
}

/// Persistent registry of Torznab endpoints (spec component C).
#[async_trait]
pub trait IndexerStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Indexer>, IndexerError>;
    async fn list_all(&self) -> Result<Vec<Indexer>, IndexerError>;
    async fn get(&self, id: i64) -> Result<Option<Indexer>, IndexerError>;
    async fn upsert(&self, new: NewIndexer) -> Result<Indexer, IndexerError>;
    async fn mark_result(&self, id: i64, outcome: IndexerOutcome) -> Result<(), IndexerError>;
    async fn clear_failures(&self) -> Result<(), IndexerError>;
    /// Persists freshly fetched `t=caps` capabilities (spec §4.C registration).
    async fn update_caps(&self, id: i64, caps: IndexerCaps) -> Result<(), IndexerError>;
}
