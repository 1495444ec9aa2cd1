//! Route handlers for the embedded admin API (spec component M).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use xseed_core::{
    enumerate_searchees, run_rss_scan, run_single_searchee_search, BulkSearchDeps,
    DataSearcheeConfig, Indexer, RssScanDeps, Searchee, SearcheeOrigin,
};

use crate::state::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.sanitized_config())
}

pub async fn list_indexers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.indexer_store().list_all().await {
        Ok(indexers) => Json(indexers).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn test_indexer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let indexer: Option<Indexer> = match state.indexer_store().get(id).await {
        Ok(v) => v,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let Some(indexer) = indexer else {
        return (StatusCode::NOT_FOUND, "indexer not found".to_string()).into_response();
    };

    let outcome = state.torznab().test_connection(&indexer).await;
    if let Err(e) = state.indexer_store().mark_result(id, outcome).await {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    Json(json!({ "outcome": format!("{:?}", outcome) })).into_response()
}

#[derive(Serialize)]
struct JobsResponse {
    search: xseed_core::JobState,
    rss: xseed_core::JobState,
}

pub async fn jobs(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(JobsResponse {
        search: state.scheduler().search_state().await,
        rss: state.scheduler().rss_state().await,
    })
}

/// Body for `POST /api/v1/search`: identifies the one local searchee to
/// re-check, either by its torrent/client infohash or by its data-origin
/// root path.
#[derive(Deserialize)]
pub struct SearchTriggerRequest {
    pub path: Option<String>,
    pub info_hash: Option<String>,
}

fn find_searchee<'a>(
    searchees: &'a [Searchee],
    req: &SearchTriggerRequest,
) -> Option<&'a Searchee> {
    if let Some(info_hash) = req.info_hash.as_deref() {
        if let Some(s) = searchees
            .iter()
            .find(|s| s.info_hash().map(|h| h.eq_ignore_ascii_case(info_hash)).unwrap_or(false))
        {
            return Some(s);
        }
    }
    if let Some(path) = req.path.as_deref() {
        return searchees
            .iter()
            .find(|s| matches!(&s.origin, SearcheeOrigin::Data { root } if root.as_os_str() == path));
    }
    None
}

pub async fn trigger_search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchTriggerRequest>,
) -> impl IntoResponse {
    if req.path.is_none() && req.info_hash.is_none() {
        return (StatusCode::BAD_REQUEST, "request body must set `path` or `info_hash`".to_string())
            .into_response();
    }

    let known = state.known_info_hashes().await;
    let deps = BulkSearchDeps {
        indexer_store: Arc::clone(state.indexer_store()),
        candidate_deps: state.candidate_deps().await,
        data_dirs: state.config().data_dirs.clone(),
        torrent_dir: state.config().torrent_dir.clone(),
        data_searchee_config: DataSearcheeConfig {
            max_data_depth: state.config().max_data_depth,
            block_list: state.config().block_list.clone(),
            include_non_videos: state.config().include_non_videos,
            include_single_episodes: state.config().include_single_episodes,
            extensions: state.config().extensions.clone(),
        },
    };

    let searchees = enumerate_searchees(&deps);
    let Some(searchee) = find_searchee(&searchees, &req) else {
        return (StatusCode::NOT_FOUND, "no local searchee matches that path or infohash".to_string())
            .into_response();
    };

    match run_single_searchee_search(&deps, searchee, &known).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn trigger_rss(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let known = state.known_info_hashes().await;
    let data_searchee_config = DataSearcheeConfig {
        max_data_depth: state.config().max_data_depth,
        block_list: state.config().block_list.clone(),
        include_non_videos: state.config().include_non_videos,
        include_single_episodes: state.config().include_single_episodes,
        extensions: state.config().extensions.clone(),
    };
    let searchees = xseed_core::from_data_dirs(&state.config().data_dirs, &data_searchee_config);

    let deps = RssScanDeps {
        indexer_store: Arc::clone(state.indexer_store()),
        cursor_store: Arc::clone(state.cursor_store()),
        candidate_deps: state.candidate_deps().await,
    };

    match run_rss_scan(&deps, &searchees, &known).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::encode_metrics(),
    )
}
