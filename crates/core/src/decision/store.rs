use async_trait::async_trait;
use thiserror::Error;

use super::types::{Decision, NewDecision, Verdict};

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("database error: {0}")]
    Db(#[from] crate::db::DbError),
}

/// Per-(searchee, candidate) memoized match outcome (spec component D).
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Idempotent on `(searchee_name, candidate_guid)`: updates `last_seen`;
    /// writes `first_seen` only on insert. Never downgrades an existing
    /// MATCH-family verdict.
    async fn record(&self, decision: NewDecision) -> Result<Decision, DecisionError>;

    /// Returns the stored verdict for this pair, if any, letting the
    /// pipeline skip re-matching a candidate it has already ruled on.
    async fn has_decision(&self, searchee_name: &str, candidate_guid: &str) -> Result<Option<Verdict>, DecisionError>;

    /// Deletes decisions with no info_hash, i.e. those that never ended in
    /// a download.
    async fn clear_cache(&self) -> Result<u64, DecisionError>;

    async fn record_timestamp(&self, searchee_name: &str, indexer_id: i64) -> Result<(), DecisionError>;

    async fn last_searched(&self, searchee_name: &str, indexer_id: i64) -> Result<Option<chrono::DateTime<chrono::Utc>>, DecisionError>;

    async fn first_searched(&self, searchee_name: &str, indexer_id: i64) -> Result<Option<chrono::DateTime<chrono::Utc>>, DecisionError>;
}
