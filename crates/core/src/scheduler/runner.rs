//! Two independent periodic loops — bulk search and RSS scan — each with a
//! single-flight guard and shift-forward cadence. Modeled on the teacher's
//! `orchestrator/runner.rs` `TicketOrchestrator` shape: an `AtomicBool`
//! running flag per loop, a `broadcast::Sender<()>` shutdown signal, and
//! `tokio::select!` racing the shutdown receiver against `sleep(cadence)`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};

use super::types::{JobName, JobState};

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type PassFn = Arc<dyn Fn() -> BoxFuture<anyhow::Result<()>> + Send + Sync>;

/// Drives the search and RSS loops. Constructed once at daemon startup with
/// the closures that actually run a bulk search / RSS scan pass; `Scheduler`
/// itself only owns cadence, single-flight, and shutdown plumbing.
pub struct Scheduler {
    search_cadence: Duration,
    rss_cadence: Duration,
    search_state: Arc<RwLock<JobState>>,
    rss_state: Arc<RwLock<JobState>>,
    search_running: Arc<AtomicBool>,
    rss_running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(search_cadence: Duration, rss_cadence: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Scheduler {
            search_cadence,
            rss_cadence,
            search_state: Arc::new(RwLock::new(JobState::idle(JobName::Search))),
            rss_state: Arc::new(RwLock::new(JobState::idle(JobName::Rss))),
            search_running: Arc::new(AtomicBool::new(false)),
            rss_running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub async fn search_state(&self) -> JobState {
        self.search_state.read().await.clone()
    }

    pub async fn rss_state(&self) -> JobState {
        self.rss_state.read().await.clone()
    }

    /// Spawns both loops as background tasks and returns immediately.
    pub fn spawn(&self, run_search: PassFn, run_rss: PassFn) {
        spawn_loop(
            JobName::Search,
            self.search_cadence,
            Arc::clone(&self.search_state),
            Arc::clone(&self.search_running),
            self.shutdown_tx.subscribe(),
            run_search,
        );
        spawn_loop(
            JobName::Rss,
            self.rss_cadence,
            Arc::clone(&self.rss_state),
            Arc::clone(&self.rss_running),
            self.shutdown_tx.subscribe(),
            run_rss,
        );
    }

    /// Signals both loops to stop after their current sleep/run completes.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn spawn_loop(
    name: JobName,
    cadence: Duration,
    state: Arc<RwLock<JobState>>,
    running_guard: Arc<AtomicBool>,
    mut shutdown_rx: broadcast::Receiver<()>,
    run_pass: PassFn,
) {
    tokio::spawn(async move {
        info!("{} loop started, cadence {:?}", name.as_str(), cadence);
        {
            let mut s = state.write().await;
            s.next_run = Some(Utc::now() + chrono::Duration::from_std(cadence).unwrap_or_default());
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("{} loop received shutdown signal", name.as_str());
                    break;
                }
                _ = tokio::time::sleep(cadence) => {}
            }

            // A tick arriving while the previous run is still in flight is
            // dropped; the next scheduled time is computed from this run's
            // end, not this tick's nominal time.
            if running_guard.swap(true, Ordering::SeqCst) {
                warn!("{} pass still running, dropping this tick", name.as_str());
                continue;
            }

            {
                let mut s = state.write().await;
                s.running = true;
            }

            if let Err(e) = run_pass().await {
                error!("{} pass failed: {}", name.as_str(), e);
            }

            let now = Utc::now();
            {
                let mut s = state.write().await;
                s.running = false;
                s.last_run = Some(now);
                s.next_run = Some(now + chrono::Duration::from_std(cadence).unwrap_or_default());
            }
            running_guard.store(false, Ordering::SeqCst);
        }

        info!("{} loop stopped", name.as_str());
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn runs_and_reports_last_run() {
        let scheduler = Scheduler::new(StdDuration::from_millis(20), StdDuration::from_secs(3600));
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::clone(&count);

        scheduler.spawn(
            Arc::new(move || {
                let count = Arc::clone(&count2);
                Box::pin(async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            }),
            Arc::new(|| Box::pin(async { Ok(()) })),
        );

        tokio::time::sleep(StdDuration::from_millis(70)).await;
        scheduler.shutdown();

        assert!(count.load(Ordering::SeqCst) >= 2);
        let state = scheduler.search_state().await;
        assert!(state.last_run.is_some());
        assert!(!state.running);
    }

    #[tokio::test]
    async fn errors_are_logged_not_propagated() {
        let scheduler = Scheduler::new(StdDuration::from_millis(15), StdDuration::from_secs(3600));
        scheduler.spawn(
            Arc::new(|| Box::pin(async { Err(anyhow::anyhow!("transient failure")) })),
            Arc::new(|| Box::pin(async { Ok(()) })),
        );
        tokio::time::sleep(StdDuration::from_millis(40)).await;
        scheduler.shutdown();
        let state = scheduler.search_state().await;
        assert!(state.last_run.is_some());
    }
}
