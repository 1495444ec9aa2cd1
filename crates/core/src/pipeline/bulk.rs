//! Bulk search pass: every local searchee against every active indexer
//! whose capabilities fit, honoring `excludeOlder`/`excludeRecentSearch`/
//! `searchLimit`, with a bounded number of concurrent indexer requests per
//! searchee and a delay between searchees.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::decision::DecisionStore;
use crate::indexer::{Indexer, IndexerOutcome, IndexerStore};
use crate::matcher::KnownInfoHashes;
use crate::metafile::Metafile;
use crate::searchee::{from_data_dirs, from_metafile, DataSearcheeConfig, Searchee};
use crate::torznab::{build_query_plan, TorznabError};

use super::candidate::{process_candidate, CandidateDeps};
use super::types::{BulkSearchSummary, CandidateOutcome, PipelineError};

/// Everything one bulk-search pass needs beyond the shared per-candidate
/// dependencies.
pub struct BulkSearchDeps {
    pub indexer_store: Arc<dyn IndexerStore>,
    pub candidate_deps: CandidateDeps,
    pub data_dirs: Vec<PathBuf>,
    pub torrent_dir: Option<PathBuf>,
    pub data_searchee_config: DataSearcheeConfig,
}

/// Builds the local searchee set from `torrentDir` and `dataDirs`.
pub fn enumerate_searchees(deps: &BulkSearchDeps) -> Vec<Searchee> {
    let mut out = from_data_dirs(&deps.data_dirs, &deps.data_searchee_config);

    if let Some(torrent_dir) = &deps.torrent_dir {
        for entry in walkdir::WalkDir::new(torrent_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("torrent") {
                continue;
            }
            let Ok(bytes) = std::fs::read(entry.path()) else { continue };
            let Ok(metafile) = Metafile::parse(&bytes) else { continue };
            let mtime = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(system_time_to_utc);
            if let Ok(searchee) = from_metafile(&metafile, mtime) {
                out.push(searchee);
            }
        }
    }
    out
}

fn system_time_to_utc(t: SystemTime) -> Option<DateTime<Utc>> {
    t.duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| DateTime::from_timestamp(d.as_secs() as i64, d.subsec_nanos()).unwrap_or_else(Utc::now))
}

/// Runs one full bulk-search pass.
pub async fn run_bulk_search(
    deps: &BulkSearchDeps,
    known_info_hashes: &KnownInfoHashes,
) -> Result<BulkSearchSummary, PipelineError> {
    let mut summary = BulkSearchSummary::default();
    let now = Utc::now();

    let mut searchees = enumerate_searchees(deps);

    if let Some(exclude_older) = deps.candidate_deps.config.exclude_older {
        let exclude_older = chrono::Duration::from_std(exclude_older).unwrap_or_default();
        searchees.retain(|s| {
            s.created_at
                .map(|t| now.signed_duration_since(t) < exclude_older)
                .unwrap_or(true)
        });
    }

    let limit = deps.candidate_deps.config.search_limit as usize;
    if limit > 0 && searchees.len() > limit {
        searchees.truncate(limit);
    }

    let active: Vec<Indexer> = deps
        .indexer_store
        .list_active()
        .await?
        .into_iter()
        .filter(|i| !i.is_on_cooldown(now))
        .collect();

    if active.is_empty() {
        warn!("bulk search pass skipped: no active indexers");
        return Ok(summary);
    }

    // `worker_pool` bounds the number of searchees processed concurrently
    // (spec §5: default `min(4, active_indexers)`); indexer queries within
    // one searchee fan out unbounded (spec §5 default).
    let worker_pool = deps.candidate_deps.config.worker_pool.max(1);
    let exclude_recent = deps
        .candidate_deps
        .config
        .exclude_recent_search
        .map(|d| chrono::Duration::from_std(d).unwrap_or_default());

    summary.searchees_processed = searchees.len();

    let tallies: Vec<Result<(usize, usize, usize), PipelineError>> = stream::iter(&searchees)
        .map(|searchee| process_one_searchee(deps, searchee, &active, known_info_hashes, exclude_recent, now))
        .buffer_unordered(worker_pool)
        .collect()
        .await;

    for tally in tallies {
        match tally {
            Ok((matched, rejected, errors)) => {
                summary.candidates_matched += matched;
                summary.candidates_rejected += rejected;
                summary.errors += errors;
            }
            Err(e) => {
                summary.errors += 1;
                warn!("bulk search for a searchee failed: {}", e);
            }
        }
    }

    Ok(summary)
}

/// Runs every due indexer query for one searchee and, once all of them have
/// settled, applies the inter-searchee delay. Each searchee is serialized
/// internally (the per-indexer fan-out below is unbounded, per spec §5's
/// default), so only `worker_pool` searchees are ever in flight across the
/// whole pass.
async fn process_one_searchee(
    deps: &BulkSearchDeps,
    searchee: &Searchee,
    active: &[Indexer],
    known_info_hashes: &KnownInfoHashes,
    exclude_recent: Option<chrono::Duration>,
    now: DateTime<Utc>,
) -> Result<(usize, usize, usize), PipelineError> {
    let mut due_indexers = Vec::new();
    for indexer in active {
        if let Some(exclude_recent) = exclude_recent {
            if let Some(last) = deps
                .candidate_deps
                .decision_store
                .last_searched(&searchee.name, indexer.id)
                .await?
            {
                if now.signed_duration_since(last) < exclude_recent {
                    continue;
                }
            }
        }
        due_indexers.push(indexer);
    }

    let results = join_all(
        due_indexers
            .into_iter()
            .map(|indexer| search_against_indexer(deps, searchee, indexer, known_info_hashes)),
    )
    .await;

    let mut matched = 0;
    let mut rejected = 0;
    let mut errors = 0;
    for result in results {
        match result {
            Ok((m, r)) => {
                matched += m;
                rejected += r;
            }
            Err(e) => {
                errors += 1;
                warn!("bulk search against an indexer failed: {}", e);
            }
        }
    }

    if !deps.candidate_deps.config.delay.is_zero() {
        tokio::time::sleep(deps.candidate_deps.config.delay).await;
    }

    Ok((matched, rejected, errors))
}

/// Runs an on-demand search for one searchee the caller has already
/// resolved (spec §6 "HTTP admin API" single-searchee trigger), against
/// every active indexer. Ignores `excludeRecentSearch` since a manual
/// trigger is an explicit request to re-check now.
pub async fn run_single_searchee_search(
    deps: &BulkSearchDeps,
    searchee: &Searchee,
    known_info_hashes: &KnownInfoHashes,
) -> Result<BulkSearchSummary, PipelineError> {
    let now = Utc::now();
    let mut summary = BulkSearchSummary { searchees_processed: 1, ..BulkSearchSummary::default() };

    let active: Vec<Indexer> = deps
        .indexer_store
        .list_active()
        .await?
        .into_iter()
        .filter(|i| !i.is_on_cooldown(now))
        .collect();

    if active.is_empty() {
        warn!("single-searchee search skipped: no active indexers");
        return Ok(summary);
    }

    let (matched, rejected, errors) =
        process_one_searchee(deps, searchee, &active, known_info_hashes, None, now).await?;
    summary.candidates_matched = matched;
    summary.candidates_rejected = rejected;
    summary.errors = errors;
    Ok(summary)
}

async fn search_against_indexer(
    deps: &BulkSearchDeps,
    searchee: &Searchee,
    indexer: &Indexer,
    known_info_hashes: &KnownInfoHashes,
) -> Result<(usize, usize), PipelineError> {
    let Some(plan) = build_query_plan(searchee, indexer) else {
        return Ok((0, 0));
    };

    let items = match deps.candidate_deps.torznab.search(indexer, &plan).await {
        Ok(items) => {
            let _ = deps.indexer_store.mark_result(indexer.id, IndexerOutcome::Success).await;
            items
        }
        Err(e) => {
            let outcome = match &e {
                TorznabError::InvalidAuth => IndexerOutcome::AuthFailed,
                TorznabError::RateLimited => IndexerOutcome::RateLimited,
                _ => IndexerOutcome::Transient,
            };
            let _ = deps.indexer_store.mark_result(indexer.id, outcome).await;
            return Err(PipelineError::Torznab(e));
        }
    };

    let mut matched = 0;
    let mut rejected = 0;
    let mut errored = 0;
    for item in &items {
        // One candidate's failure never aborts the pass (spec §4.H, §8):
        // log and keep going rather than propagating with `?`.
        match process_candidate(&deps.candidate_deps, searchee, indexer, item, known_info_hashes).await {
            Ok(CandidateOutcome::Matched) => matched += 1,
            Ok(CandidateOutcome::Rejected) => rejected += 1,
            Ok(CandidateOutcome::Cached) => {}
            Err(e) => {
                errored += 1;
                warn!(
                    "candidate {} for searchee {} failed: {}",
                    item.guid, searchee.name, e
                );
            }
        }
    }
    if errored > 0 {
        warn!("{} candidate(s) for searchee {} on indexer {} failed", errored, searchee.name, indexer.display_name());
    }

    Ok((matched, rejected))
}
