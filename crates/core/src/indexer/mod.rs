//! Indexer registry: persistent Torznab endpoints with capabilities,
//! health, and cooldown (spec component C).

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteIndexerStore;
pub use store::{IndexerError, IndexerStore};
pub use types::{
    backoff_duration, Indexer, IndexerCaps, IndexerOutcome, IndexerStatus, NewIndexer,
};
