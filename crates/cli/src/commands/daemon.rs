//! `daemon`: spawns both scheduler loops and, unless `--no-port` disabled
//! it, serves the embedded admin API until interrupted.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::create_router;
use crate::commands::pass;
use crate::state::AppState;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let search_state = Arc::clone(&state);
    let run_search: Arc<dyn Fn() -> BoxFuture<anyhow::Result<()>> + Send + Sync> =
        Arc::new(move || -> BoxFuture<anyhow::Result<()>> {
            let state = Arc::clone(&search_state);
            Box::pin(async move { pass::run_search(&state).await })
        });

    let rss_state = Arc::clone(&state);
    let run_rss: Arc<dyn Fn() -> BoxFuture<anyhow::Result<()>> + Send + Sync> =
        Arc::new(move || -> BoxFuture<anyhow::Result<()>> {
            let state = Arc::clone(&rss_state);
            Box::pin(async move { pass::run_rss(&state).await })
        });

    state.scheduler().spawn(run_search, run_rss);

    let Some(port) = state.config().port else {
        info!("admin API disabled (--no-port); running scheduler loops only");
        shutdown_signal().await;
        state.scheduler().shutdown();
        return Ok(());
    };

    let addr = std::net::SocketAddr::new(state.config().host, port);
    let listener = TcpListener::bind(addr).await?;
    info!("admin API listening on {}", addr);

    let app = create_router(Arc::clone(&state));
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    state.scheduler().shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
