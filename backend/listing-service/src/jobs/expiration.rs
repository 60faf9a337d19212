//! Expiration worker
//!
//! Moves posts whose lifetime has run out from Active to Archived and
//! deactivates their boost schedules. Each row is archived under a
//! compare-and-swap on `status = active`, so re-running a sweep (after a
//! crash, or concurrently with a moderator decision) turns the second
//! writer into a no-op instead of a corruption.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::SchedulerConfig;
use crate::db::{BoostScheduleStore, PostStore};
use crate::error::Result;
use crate::metrics::workers as metrics;
use crate::models::{Post, PostStatus};

use super::Worker;

const WORKER_NAME: &str = "expiration";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationStats {
    /// Rows matched by the expiry scan
    pub examined: usize,
    /// Rows this sweep actually archived
    pub archived: usize,
    /// Rows that lost the status race to another writer
    pub superseded: usize,
    /// Rows skipped because their update failed; retried next tick
    pub failed: usize,
}

#[derive(Clone)]
pub struct ExpirationWorker {
    posts: Arc<dyn PostStore>,
    boosts: Arc<dyn BoostScheduleStore>,
    interval: Duration,
    error_backoff: Duration,
}

impl ExpirationWorker {
    pub fn new(
        posts: Arc<dyn PostStore>,
        boosts: Arc<dyn BoostScheduleStore>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            posts,
            boosts,
            interval: Duration::from_secs(config.expiration_interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }

    /// One expiry pass. Row failures are counted and skipped; the polling
    /// loop revisits every qualifying row on the next tick anyway.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<ExpirationStats> {
        let expired = self.posts.find_expired_active(now).await?;
        let mut stats = ExpirationStats {
            examined: expired.len(),
            ..Default::default()
        };

        for post in &expired {
            match self.archive_one(post, now).await {
                Ok(true) => stats.archived += 1,
                Ok(false) => stats.superseded += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        post_id = %post.id,
                        error = %e,
                        "Failed to archive expired post, skipping row this tick"
                    );
                }
            }
        }

        metrics::record_archived("archived", stats.archived as u64);
        metrics::record_archived("failed", stats.failed as u64);

        if stats.archived > 0 {
            tracing::info!(
                examined = stats.examined,
                archived = stats.archived,
                superseded = stats.superseded,
                failed = stats.failed,
                "Archived expired posts"
            );
        }

        Ok(stats)
    }

    async fn archive_one(&self, post: &Post, now: DateTime<Utc>) -> Result<bool> {
        let won = self
            .posts
            .transition_status(post.id, &[PostStatus::Active], PostStatus::Archived, now)
            .await?;

        if !won {
            return Ok(false);
        }

        // The schedule row is kept for boost_count auditing, only switched off.
        if let Err(e) = self.boosts.deactivate_for_post(post.id).await {
            tracing::warn!(
                post_id = %post.id,
                error = %e,
                "Archived post but failed to deactivate its boost schedule"
            );
        }

        Ok(true)
    }
}

#[async_trait]
impl Worker for ExpirationWorker {
    fn name(&self) -> &'static str {
        WORKER_NAME
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Expiration worker started"
        );

        let mut delay = self.interval;
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Expiration worker stopping");
                    break;
                }
                _ = sleep(delay) => {}
            }

            let started = Instant::now();
            delay = match self.sweep(Utc::now()).await {
                Ok(_) => {
                    metrics::record_sweep(WORKER_NAME, "success");
                    self.interval
                }
                Err(e) => {
                    metrics::record_sweep(WORKER_NAME, "error");
                    tracing::error!(error = %e, "Expiration sweep failed, backing off");
                    self.error_backoff
                }
            };
            metrics::observe_sweep_duration(WORKER_NAME, started.elapsed());
        }
    }
}
