//! Torznab client: builds queries from a searchee, executes them, parses
//! RSS/Torznab results, and snatches candidate torrents (spec component E).

mod client;
mod query;
mod types;

pub use client::TorznabClient;
pub use query::build_query_plan;
pub use types::{classify_status, QueryKind, QueryPlan, TorznabError, TorznabItem};
