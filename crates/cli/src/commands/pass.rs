//! One-shot `rss` and `search` subcommands: build state, run exactly one
//! pass, print the summary, exit.

use std::sync::Arc;

use anyhow::Result;

use xseed_core::{run_bulk_search, run_rss_scan, BulkSearchDeps, DataSearcheeConfig, RssScanDeps};

use crate::state::AppState;

async fn data_searchee_config(state: &AppState) -> DataSearcheeConfig {
    DataSearcheeConfig {
        max_data_depth: state.config().max_data_depth,
        block_list: state.config().block_list.clone(),
        include_non_videos: state.config().include_non_videos,
        include_single_episodes: state.config().include_single_episodes,
        extensions: state.config().extensions.clone(),
    }
}

pub async fn run_search(state: &Arc<AppState>) -> Result<()> {
    let known = state.known_info_hashes().await;
    let deps = BulkSearchDeps {
        indexer_store: Arc::clone(state.indexer_store()),
        candidate_deps: state.candidate_deps().await,
        data_dirs: state.config().data_dirs.clone(),
        torrent_dir: state.config().torrent_dir.clone(),
        data_searchee_config: data_searchee_config(state).await,
    };

    let summary = run_bulk_search(&deps, &known).await?;
    println!(
        "search pass complete: {} searchees processed, {} matched, {} rejected, {} errors",
        summary.searchees_processed, summary.candidates_matched, summary.candidates_rejected, summary.errors
    );
    Ok(())
}

pub async fn run_rss(state: &Arc<AppState>) -> Result<()> {
    let known = state.known_info_hashes().await;
    let searchees = xseed_core::from_data_dirs(&state.config().data_dirs, &data_searchee_config(state).await);

    let deps = RssScanDeps {
        indexer_store: Arc::clone(state.indexer_store()),
        cursor_store: Arc::clone(state.cursor_store()),
        candidate_deps: state.candidate_deps().await,
    };

    let summary = run_rss_scan(&deps, &searchees, &known).await?;
    println!(
        "rss pass complete: {} indexers scanned, {} items processed, {} matched, {} errors",
        summary.indexers_scanned, summary.items_processed, summary.candidates_matched, summary.errors
    );
    Ok(())
}
