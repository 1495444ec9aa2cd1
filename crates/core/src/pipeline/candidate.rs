use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Action;
use crate::decision::{Decision, DecisionStore, NewDecision, Verdict};
use crate::indexer::Indexer;
use crate::linker::{link_candidate, LinkPlan};
use crate::matcher::{evaluate, evaluate_preliminary, should_recheck, CandidateMeta, KnownInfoHashes};
use crate::metafile::Metafile;
use crate::notifier::{Notification, NotifierHandle};
use crate::searchee::{Searchee, SearcheeFile, SearcheeOrigin};
use crate::torrent_client::TorrentClient;
use crate::torznab::{TorznabClient, TorznabItem};

use super::types::{CandidateOutcome, PipelineConfig, PipelineError};

/// Everything the per-candidate flow needs, grouped so `bulk`/`rss` can
/// build it once per pass.
pub struct CandidateDeps {
    pub decision_store: Arc<dyn DecisionStore>,
    pub torznab: Arc<TorznabClient>,
    pub torrent_client: Arc<dyn TorrentClient>,
    pub notifier: Option<NotifierHandle>,
    pub config: PipelineConfig,
}

/// Runs the 8-step flow of spec §4.H for one (searchee, candidate) pair.
/// Errors from any one candidate are the caller's to log; they never
/// abort the pass.
pub async fn process_candidate(
    deps: &CandidateDeps,
    searchee: &Searchee,
    indexer: &Indexer,
    item: &TorznabItem,
    known_info_hashes: &KnownInfoHashes,
) -> Result<CandidateOutcome, PipelineError> {
    // (i) short-circuit on a cached terminal decision.
    if deps
        .decision_store
        .has_decision(&searchee.name, &item.guid)
        .await?
        .is_some()
    {
        return Ok(CandidateOutcome::Cached);
    }

    // (ii) preliminary matcher pass against title/size/infohash alone.
    if let Some(verdict) = evaluate_preliminary(
        searchee,
        &item.title,
        item.info_hash.as_deref(),
        item.size,
        &deps.config.policy,
        known_info_hashes,
    ) {
        record(deps, searchee, indexer, item, verdict, None).await?;
        notify_if_terminal(deps, searchee, &item.title, verdict).await;
        return Ok(CandidateOutcome::Rejected);
    }

    // (iii) snatch.
    let bytes = match deps.torznab.snatch(&item.link).await {
        Ok(bytes) => bytes,
        Err(_) => {
            record(deps, searchee, indexer, item, Verdict::NoDownloadLink, None).await?;
            return Ok(CandidateOutcome::Rejected);
        }
    };
    let metafile = match Metafile::parse(&bytes) {
        Ok(m) => m,
        Err(_) => {
            record(deps, searchee, indexer, item, Verdict::NoDownloadLink, None).await?;
            return Ok(CandidateOutcome::Rejected);
        }
    };

    // (iv) re-run the matcher against the now-known full file list.
    let candidate_files: Vec<SearcheeFile> = metafile
        .files
        .iter()
        .map(|f| SearcheeFile { relative_path: f.relative_path(), size: f.length })
        .collect();
    let candidate_meta = CandidateMeta {
        title: metafile.name.clone(),
        info_hash: Some(metafile.info_hash.clone()),
        total_size: metafile.total_size(),
        files: candidate_files.clone(),
    };
    let verdict = evaluate(searchee, &candidate_meta, &deps.config.policy, known_info_hashes);

    // (v) persist the decision.
    let persisted = record(deps, searchee, indexer, item, verdict, Some(metafile.info_hash.clone())).await?;

    if !verdict.is_match_family() {
        notify_if_terminal(deps, searchee, &item.title, verdict).await;
        return Ok(CandidateOutcome::Rejected);
    }

    // (vi) write the artifact.
    write_artifact(&deps.config.output_dir, indexer, &metafile)?;

    // (vii) optional injection.
    if deps.config.action == Action::Inject {
        let link_path = if searchee.is_data_origin() {
            match (&deps.config.link_dir, &searchee.origin) {
                (Some(link_dir), SearcheeOrigin::Data { root }) => {
                    let plan = LinkPlan {
                        link_dir: link_dir.clone(),
                        link_type: deps.config.link_type,
                        flat_linking: deps.config.flat_linking,
                    };
                    let tracker = indexer.name.as_deref();
                    let linked = link_candidate(root, &searchee.files, &metafile.name, &candidate_files, tracker, &plan)?;
                    linked.first().and_then(|f| f.destination.parent().map(PathBuf::from))
                }
                _ => None,
            }
        } else {
            None
        };

        let outcome = deps
            .torrent_client
            .inject(&metafile, searchee, &persisted, link_path.as_deref())
            .await?;

        if outcome == crate::torrent_client::InjectOutcome::Success
            && should_recheck(verdict, searchee, &deps.config.policy)
        {
            deps.torrent_client.recheck_torrent(&metafile.info_hash).await?;
        }
    }

    // (viii) notify.
    notify_if_terminal(deps, searchee, &item.title, verdict).await;

    Ok(CandidateOutcome::Matched)
}

async fn record(
    deps: &CandidateDeps,
    searchee: &Searchee,
    indexer: &Indexer,
    item: &TorznabItem,
    verdict: Verdict,
    info_hash: Option<String>,
) -> Result<Decision, PipelineError> {
    let decision = deps
        .decision_store
        .record(NewDecision {
            searchee_name: searchee.name.clone(),
            candidate_guid: item.guid.clone(),
            indexer_id: indexer.id,
            verdict,
            info_hash,
            fuzzy_size_factor: None,
        })
        .await?;
    deps.decision_store.record_timestamp(&searchee.name, indexer.id).await?;
    Ok(decision)
}

async fn notify_if_terminal(deps: &CandidateDeps, searchee: &Searchee, candidate_title: &str, verdict: Verdict) {
    if !verdict.is_match_family() {
        return;
    }
    if let Some(notifier) = &deps.notifier {
        notifier
            .emit(Notification::new(
                "xseed match found",
                format!("{} matched {} ({})", searchee.name, candidate_title, verdict.as_str()),
            ))
            .await;
    }
}

/// Writes the artifact to `outputDir/[tracker/]<name>.cross-seed.torrent`
/// (spec §6 "Persisted state").
fn write_artifact(output_dir: &std::path::Path, indexer: &Indexer, metafile: &Metafile) -> Result<(), PipelineError> {
    let mut path = output_dir.to_path_buf();
    if let Some(tracker) = &indexer.name {
        path.push(sanitize_segment(tracker));
    }
    std::fs::create_dir_all(&path)?;
    path.push(format!("{}.cross-seed.torrent", sanitize_segment(&metafile.name)));
    std::fs::write(path, metafile.bytes())?;
    Ok(())
}

fn sanitize_segment(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
