//! RSS scan pass: per-indexer generic `search` query with no terms to
//! fetch the newest items, matched against every local searchee, stopping
//! once the indexer's cursor is reached (spec §4.H).

use std::sync::Arc;

use tracing::warn;

use crate::indexer::{Indexer, IndexerOutcome, IndexerStore};
use crate::matcher::KnownInfoHashes;
use crate::searchee::Searchee;
use crate::torznab::{QueryKind, QueryPlan, TorznabError, TorznabItem};

use super::candidate::{process_candidate, CandidateDeps};
use super::cursor::RssCursorStore;
use super::types::{CandidateOutcome, PipelineError, RssScanSummary};

pub struct RssScanDeps {
    pub indexer_store: Arc<dyn IndexerStore>,
    pub cursor_store: Arc<RssCursorStore>,
    pub candidate_deps: CandidateDeps,
}

/// Runs one RSS scan pass across every active indexer.
pub async fn run_rss_scan(
    deps: &RssScanDeps,
    searchees: &[Searchee],
    known_info_hashes: &KnownInfoHashes,
) -> Result<RssScanSummary, PipelineError> {
    let mut summary = RssScanSummary::default();
    let now = chrono::Utc::now();

    let active: Vec<Indexer> = deps
        .indexer_store
        .list_active()
        .await?
        .into_iter()
        .filter(|i| !i.is_on_cooldown(now))
        .collect();

    for indexer in &active {
        if !indexer.caps.search {
            continue;
        }
        summary.indexers_scanned += 1;

        let plan = QueryPlan { indexer_id: indexer.id, kind: QueryKind::Search, terms: String::new(), season: None, episode: None };

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
                summary.errors += 1;
                warn!("rss scan against indexer {} failed: {}", indexer.display_name(), e);
                continue;
            }
        };

        let cursor = deps.cursor_store.get(indexer.id).await?;

        for item in items_newest_first(items) {
            if cursor.covers(item.pub_date, &item.guid) {
                // The cursor stops the scan once we reach an item already
                // seen on a prior pass (spec §4.H).
                break;
            }
            summary.items_processed += 1;

            match process_item_against_local_searchees(deps, searchees, indexer, &item, known_info_hashes).await {
                Ok(matched) => summary.candidates_matched += matched,
                Err(e) => {
                    summary.errors += 1;
                    warn!("rss item {} failed: {}", item.guid, e);
                }
            }

            deps.cursor_store.advance(indexer.id, item.pub_date, &item.guid).await?;
        }
    }

    Ok(summary)
}

fn items_newest_first(mut items: Vec<TorznabItem>) -> Vec<TorznabItem> {
    items.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
    items
}

/// For one RSS item, tries every local searchee against it. An item may
/// reasonably match more than one searchee name only coincidentally; in
/// practice at most one match is expected and counted.
async fn process_item_against_local_searchees(
    deps: &RssScanDeps,
    searchees: &[Searchee],
    indexer: &Indexer,
    item: &TorznabItem,
    known_info_hashes: &KnownInfoHashes,
) -> Result<usize, PipelineError> {
    let mut matched = 0;
    for searchee in searchees {
        match process_candidate(&deps.candidate_deps, searchee, indexer, item, known_info_hashes).await {
            Ok(CandidateOutcome::Matched) => matched += 1,
            Ok(CandidateOutcome::Rejected) | Ok(CandidateOutcome::Cached) => {}
            Err(e) => warn!("candidate {} vs searchee {} failed: {}", item.guid, searchee.name, e),
        }
    }
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torznab::TorznabItem;
    use chrono::{Duration, Utc};

    fn item(guid: &str, secs_ago: i64) -> TorznabItem {
        TorznabItem {
            title: guid.to_string(),
            guid: guid.to_string(),
            link: format!("https://example.test/{}", guid),
            size: 1,
            pub_date: Some(Utc::now() - Duration::seconds(secs_ago)),
            info_hash: None,
            categories: Vec::new(),
        }
    }

    #[test]
    fn orders_newest_first() {
        let items = vec![item("old", 100), item("new", 1)];
        let sorted = items_newest_first(items);
        assert_eq!(sorted[0].guid, "new");
        assert_eq!(sorted[1].guid, "old");
    }
}
