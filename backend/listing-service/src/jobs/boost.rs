//! Boost worker
//!
//! Advances the promotion cursor of boosted posts. A boost refreshes the
//! post's `updated_at` so recency-based ranking surfaces it again, then
//! either schedules the next boost or retires the schedule once the next
//! slot would fall outside the package's entitlement window.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::SchedulerConfig;
use crate::db::{BoostScheduleStore, PostStore};
use crate::error::Result;
use crate::metrics::workers as metrics;
use crate::models::{BoostSchedule, PostStatus};

use super::Worker;

const WORKER_NAME: &str = "boost";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BoostStats {
    /// Schedules matched by the due scan
    pub examined: usize,
    /// Boosts applied with a next slot scheduled
    pub boosted: usize,
    /// Boosts applied whose entitlement is now exhausted
    pub exhausted: usize,
    /// Rows skipped because the post left Active between scan and write
    pub skipped: usize,
    /// Schedules deactivated for missing entitlement
    pub orphaned: usize,
    /// Rows skipped after a storage error; retried next tick
    pub failed: usize,
}

#[derive(Clone)]
pub struct BoostWorker {
    posts: Arc<dyn PostStore>,
    boosts: Arc<dyn BoostScheduleStore>,
    interval: Duration,
    error_backoff: Duration,
}

impl BoostWorker {
    pub fn new(
        posts: Arc<dyn PostStore>,
        boosts: Arc<dyn BoostScheduleStore>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            posts,
            boosts,
            interval: Duration::from_secs(config.boost_interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
        }
    }

    /// One promotion pass over all due schedules.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<BoostStats> {
        let due = self.boosts.find_due(now).await?;
        let mut stats = BoostStats {
            examined: due.len(),
            ..Default::default()
        };

        for schedule in &due {
            match self.boost_one(schedule, now).await {
                Ok(RowOutcome::Boosted) => stats.boosted += 1,
                Ok(RowOutcome::Exhausted) => stats.exhausted += 1,
                Ok(RowOutcome::Skipped) => stats.skipped += 1,
                Ok(RowOutcome::Orphaned) => stats.orphaned += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        schedule_id = %schedule.id,
                        post_id = %schedule.post_id,
                        error = %e,
                        "Failed to boost post, skipping row this tick"
                    );
                }
            }
        }

        metrics::record_boosts("boosted", stats.boosted as u64);
        metrics::record_boosts("exhausted", stats.exhausted as u64);
        metrics::record_boosts("orphaned", stats.orphaned as u64);

        if stats.boosted + stats.exhausted > 0 {
            tracing::info!(
                examined = stats.examined,
                boosted = stats.boosted,
                exhausted = stats.exhausted,
                skipped = stats.skipped,
                orphaned = stats.orphaned,
                failed = stats.failed,
                "Boost sweep completed"
            );
        }

        Ok(stats)
    }

    async fn boost_one(&self, schedule: &BoostSchedule, now: DateTime<Utc>) -> Result<RowOutcome> {
        // Re-read the authoritative post row; the due scan may be stale.
        let post = match self.posts.find_by_id(schedule.post_id).await? {
            Some(post) => post,
            None => {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    post_id = %schedule.post_id,
                    "Boost schedule points at a missing post, deactivating"
                );
                self.boosts
                    .deactivate(schedule.id, schedule.boost_count)
                    .await?;
                return Ok(RowOutcome::Orphaned);
            }
        };

        if post.status != PostStatus::Active {
            // Lost the race against expiration or a moderator; the other
            // transition owns schedule deactivation.
            return Ok(RowOutcome::Skipped);
        }

        let package = match post.package.as_ref().filter(|p| p.has_boost) {
            Some(package) => package,
            None => {
                tracing::warn!(
                    schedule_id = %schedule.id,
                    post_id = %post.id,
                    "Boost schedule exists without boost entitlement, deactivating"
                );
                self.boosts
                    .deactivate(schedule.id, schedule.boost_count)
                    .await?;
                return Ok(RowOutcome::Orphaned);
            }
        };

        if !self.posts.touch_active(post.id, now).await? {
            return Ok(RowOutcome::Skipped);
        }

        let boost_count = schedule.boost_count + 1;
        let candidate_next = now + ChronoDuration::days(package.boost_interval_days);
        let entitlement_end = post.created_at + ChronoDuration::days(package.duration_days);

        if candidate_next < entitlement_end {
            self.boosts
                .advance(schedule.id, candidate_next, boost_count)
                .await?;
            tracing::debug!(
                post_id = %post.id,
                boost_count,
                next_boost_at = %candidate_next,
                "Boosted post"
            );
            Ok(RowOutcome::Boosted)
        } else {
            // The boost still happened; only the cursor retires.
            self.boosts.deactivate(schedule.id, boost_count).await?;
            tracing::debug!(
                post_id = %post.id,
                boost_count,
                "Boost entitlement exhausted"
            );
            Ok(RowOutcome::Exhausted)
        }
    }
}

enum RowOutcome {
    Boosted,
    Exhausted,
    Skipped,
    Orphaned,
}

#[async_trait]
impl Worker for BoostWorker {
    fn name(&self) -> &'static str {
        WORKER_NAME
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Boost worker started"
        );

        let mut delay = self.interval;
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Boost worker stopping");
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
                    tracing::error!(error = %e, "Boost sweep failed, backing off");
                    self.error_backoff
                }
            };
            metrics::observe_sweep_duration(WORKER_NAME, started.elapsed());
        }
    }
}
