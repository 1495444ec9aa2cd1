//! Decision cache: per-(searchee, candidate) memoized match outcome, and
//! per-(searchee, indexer) last-search timestamps (spec component D).

mod sqlite;
mod store;
mod types;

pub use sqlite::SqliteDecisionStore;
pub use store::{DecisionError, DecisionStore};
pub use types::{Decision, NewDecision, Verdict};
