//! `inject`: takes one local `.torrent` file, matches it against every
//! local searchee in `torrent_dir`/`data_dirs`, and on a MATCH-family
//! verdict links (for data-origin searchees) and hands it to the
//! configured torrent client — the single-candidate analogue of the
//! per-candidate flow a full pass runs automatically.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use xseed_core::{
    enumerate_searchees, evaluate, link_candidate, should_recheck, BulkSearchDeps, CandidateMeta,
    InjectOutcome, LinkPlan, Metafile, NewDecision, SearcheeFile, SearcheeOrigin,
};

use crate::state::AppState;

pub async fn run(state: &Arc<AppState>, path: &Path) -> Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some("torrent") {
        bail!("inject expects a path to a `.torrent` file, got {}", path.display());
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("reading torrent file at {}", path.display()))?;
    let metafile = Metafile::parse(&bytes)
        .map_err(|e| anyhow::anyhow!("parsing {}: {}", path.display(), e))?;

    let candidate_files: Vec<SearcheeFile> = metafile
        .files
        .iter()
        .map(|f| SearcheeFile { relative_path: f.relative_path(), size: f.length })
        .collect();
    let candidate = CandidateMeta {
        title: metafile.name.clone(),
        info_hash: Some(metafile.info_hash.clone()),
        total_size: metafile.total_size(),
        files: candidate_files.clone(),
    };

    let candidate_deps = state.candidate_deps().await;
    let known = state.known_info_hashes().await;

    let bulk_deps = BulkSearchDeps {
        indexer_store: Arc::clone(state.indexer_store()),
        candidate_deps,
        data_dirs: state.config().data_dirs.clone(),
        torrent_dir: state.config().torrent_dir.clone(),
        data_searchee_config: xseed_core::DataSearcheeConfig {
            max_data_depth: state.config().max_data_depth,
            block_list: state.config().block_list.clone(),
            include_non_videos: state.config().include_non_videos,
            include_single_episodes: state.config().include_single_episodes,
            extensions: state.config().extensions.clone(),
        },
    };
    let searchees = enumerate_searchees(&bulk_deps);

    let policy = &bulk_deps.candidate_deps.config.policy;
    let Some(searchee) = searchees
        .iter()
        .find(|s| evaluate(s, &candidate, policy, &known).is_match_family())
    else {
        println!("no local searchee matches {}; nothing injected", metafile.name);
        return Ok(());
    };
    let verdict = evaluate(searchee, &candidate, policy, &known);

    let persisted = bulk_deps
        .candidate_deps
        .decision_store
        .record(NewDecision {
            searchee_name: searchee.name.clone(),
            candidate_guid: format!("manual:{}", path.display()),
            indexer_id: 0,
            verdict,
            info_hash: Some(metafile.info_hash.clone()),
            fuzzy_size_factor: None,
        })
        .await
        .context("persisting decision")?;

    let link_path: Option<PathBuf> = if searchee.is_data_origin() {
        match (&bulk_deps.candidate_deps.config.link_dir, &searchee.origin) {
            (Some(link_dir), SearcheeOrigin::Data { root }) => {
                let plan = LinkPlan {
                    link_dir: link_dir.clone(),
                    link_type: bulk_deps.candidate_deps.config.link_type,
                    flat_linking: bulk_deps.candidate_deps.config.flat_linking,
                };
                let linked =
                    link_candidate(root, &searchee.files, &metafile.name, &candidate_files, None, &plan)
                        .context("linking matched files")?;
                linked.first().and_then(|f| f.destination.parent().map(PathBuf::from))
            }
            _ => None,
        }
    } else {
        None
    };

    let outcome = bulk_deps
        .candidate_deps
        .torrent_client
        .inject(&metafile, searchee, &persisted, link_path.as_deref())
        .await
        .context("injecting into torrent client")?;

    if outcome == InjectOutcome::Success && should_recheck(verdict, searchee, policy) {
        bulk_deps
            .candidate_deps
            .torrent_client
            .recheck_torrent(&metafile.info_hash)
            .await
            .context("rechecking injected torrent")?;
    }

    println!(
        "{} matched {} ({}): injection outcome {:?}",
        metafile.name,
        searchee.name,
        verdict.as_str(),
        outcome
    );
    Ok(())
}
