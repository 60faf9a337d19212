//! Scheduler orchestrator
//!
//! Owns the three lifecycle workers as one supervised unit. Each worker
//! runs in its own task behind a supervisor loop: a panic is caught,
//! logged and the worker restarted after a short delay instead of dying
//! silently. A single broadcast signal stops the group; shutdown waits for
//! every worker to drain its in-flight sweep before returning.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::SchedulerConfig;
use crate::db::{BoostScheduleStore, ModerationLogStore, PostStore};

use super::{BoostWorker, CleanupWorker, ExpirationWorker, Worker};

/// Delay before restarting a panicked worker
const RESTART_DELAY: Duration = Duration::from_secs(5);

pub struct Scheduler {
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_timeout: Duration,
}

impl Scheduler {
    /// Spawn the expiration, boost and cleanup workers.
    pub fn start(
        posts: Arc<dyn PostStore>,
        boosts: Arc<dyn BoostScheduleStore>,
        log: Arc<dyn ModerationLogStore>,
        config: &SchedulerConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let expiration = ExpirationWorker::new(posts.clone(), boosts.clone(), config);
        let boost = BoostWorker::new(posts.clone(), boosts.clone(), config);
        let cleanup = CleanupWorker::new(posts, boosts, log, config);

        let handles = vec![
            spawn_supervised(expiration, shutdown_tx.clone()),
            spawn_supervised(boost, shutdown_tx.clone()),
            spawn_supervised(cleanup, shutdown_tx.clone()),
        ];

        tracing::info!("Lifecycle scheduler started with 3 workers");

        Self {
            shutdown_tx,
            handles,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }

    /// Signal all workers and wait for them to drain.
    pub async fn shutdown(self) {
        tracing::info!("Shutting down lifecycle scheduler...");
        // Receivers may already be gone if every worker died; nothing to do then.
        let _ = self.shutdown_tx.send(());

        for (name, handle) in self.handles {
            match tokio::time::timeout(self.shutdown_timeout, handle).await {
                Ok(Ok(())) => tracing::info!(worker = name, "Worker shut down gracefully"),
                Ok(Err(e)) => tracing::warn!(worker = name, error = %e, "Worker task failed"),
                Err(_) => {
                    tracing::warn!(worker = name, "Worker did not shut down within timeout")
                }
            }
        }

        tracing::info!("Lifecycle scheduler shut down complete");
    }
}

/// Run a worker under a supervisor that restarts it after a panic.
fn spawn_supervised<W: Worker>(
    worker: W,
    shutdown_tx: broadcast::Sender<()>,
) -> (&'static str, JoinHandle<()>) {
    let name = worker.name();
    let handle = tokio::spawn(async move {
        loop {
            let mut restart_rx = shutdown_tx.subscribe();
            let worker_rx = shutdown_tx.subscribe();
            let task = tokio::spawn(worker.clone().run(worker_rx));

            match task.await {
                // Clean exit: the worker observed the shutdown signal
                Ok(()) => break,
                Err(e) if e.is_panic() => {
                    tracing::error!(worker = name, "Worker panicked, restarting");
                    tokio::select! {
                        _ = restart_rx.recv() => break,
                        _ = tokio::time::sleep(RESTART_DELAY) => {}
                    }
                }
                Err(_) => break,
            }
        }
    });

    (name, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;

    fn test_config() -> SchedulerConfig {
        SchedulerConfig {
            expiration_interval_secs: 3600,
            boost_interval_secs: 1800,
            cleanup_interval_secs: 86_400,
            error_backoff_secs: 60,
            moderation_log_retention_days: 30,
            post_view_retention_days: 90,
            shutdown_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_scheduler_starts_and_shuts_down() {
        let store = InMemoryStore::new();
        let scheduler = Scheduler::start(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            &test_config(),
        );

        assert_eq!(scheduler.handles.len(), 3);

        // Shutdown must complete promptly even though every worker is
        // mid-sleep on a long interval.
        tokio::time::timeout(Duration::from_secs(10), scheduler.shutdown())
            .await
            .expect("scheduler shutdown timed out");
    }
}
