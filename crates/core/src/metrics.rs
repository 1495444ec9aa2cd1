//! Prometheus metrics for the pipeline, indexers, and scheduler.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

/// Candidates evaluated, by resulting verdict.
pub static CANDIDATES_EVALUATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("xseed_candidates_evaluated_total", "Total candidates evaluated by the matcher"),
        &["verdict"],
    )
    .unwrap()
});

/// Torznab queries issued, by indexer and outcome.
pub static INDEXER_QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("xseed_indexer_queries_total", "Total Torznab queries issued"),
        &["indexer", "outcome"],
    )
    .unwrap()
});

/// Torznab query duration in seconds.
pub static INDEXER_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("xseed_indexer_query_duration_seconds", "Duration of Torznab queries")
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["indexer"],
    )
    .unwrap()
});

/// Indexers currently on a rate-limit cooldown.
pub static INDEXERS_ON_COOLDOWN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("xseed_indexers_on_cooldown", "Number of indexers currently on cooldown").unwrap()
});

/// Injections attempted, by outcome.
pub static INJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("xseed_injections_total", "Total injection attempts into the torrent client"),
        &["outcome"],
    )
    .unwrap()
});

/// Links created by the linker, by link type.
pub static LINKS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("xseed_links_created_total", "Total files linked into linkDir"),
        &["link_type"],
    )
    .unwrap()
});

/// Notifications delivered, by outcome.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("xseed_notifications_total", "Total webhook notifications sent"),
        &["outcome"],
    )
    .unwrap()
});

/// Scheduled pass durations, by job name.
pub static PASS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("xseed_pass_duration_seconds", "Duration of a bulk search or RSS scan pass")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0]),
        &["job"],
    )
    .unwrap()
});

/// Returns every metric for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CANDIDATES_EVALUATED.clone()),
        Box::new(INDEXER_QUERIES.clone()),
        Box::new(INDEXER_QUERY_DURATION.clone()),
        Box::new(INDEXERS_ON_COOLDOWN.clone()),
        Box::new(INJECTIONS_TOTAL.clone()),
        Box::new(LINKS_CREATED.clone()),
        Box::new(NOTIFICATIONS_TOTAL.clone()),
        Box::new(PASS_DURATION.clone()),
    ]
}
