use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{handlers, middleware::auth_middleware, middleware::metrics_middleware};
use crate::state::AppState;

/// Builds the embedded admin API's router (spec §4.M): health and
/// config-echo are unauthenticated; everything else sits behind
/// `auth_middleware`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .route("/indexers", get(handlers::list_indexers))
        .route("/indexers/{id}/test", post(handlers::test_indexer))
        .route("/jobs", get(handlers::jobs))
        .route("/search", post(handlers::trigger_search))
        .route("/rss", post(handlers::trigger_rss))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
}
