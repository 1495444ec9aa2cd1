//! Pipeline: orchestrates a search pass end to end — enumerate searchees,
//! fan out to indexers, filter, match, persist, emit artifact, optionally
//! hand to the injector (spec component H).

mod bulk;
mod candidate;
mod cursor;
mod rss;
mod types;

pub use bulk::{enumerate_searchees, run_bulk_search, run_single_searchee_search, BulkSearchDeps};
pub use candidate::{process_candidate, CandidateDeps};
pub use cursor::{RssCursor, RssCursorStore};
pub use rss::{run_rss_scan, RssScanDeps};
pub use types::{
    BulkSearchSummary, CandidateOutcome, PipelineConfig, PipelineError, RssScanSummary,
};
