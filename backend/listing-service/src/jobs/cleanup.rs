//! Cleanup worker
//!
//! Retention hygiene: purges moderation audit records and post view rows
//! past their windows, and deactivates boost schedules whose post has left
//! Active. Advisory only: nothing user-visible depends on a cycle, so
//! failures are logged and simply retried on the next one.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::SchedulerConfig;
use crate::db::{BoostScheduleStore, ModerationLogStore, PostStore};
use crate::error::Result;
use crate::metrics::workers as metrics;

use super::Worker;

const WORKER_NAME: &str = "cleanup";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub moderation_records_purged: u64,
    pub views_purged: u64,
    pub schedules_deactivated: u64,
}

#[derive(Clone)]
pub struct CleanupWorker {
    posts: Arc<dyn PostStore>,
    boosts: Arc<dyn BoostScheduleStore>,
    log: Arc<dyn ModerationLogStore>,
    interval: Duration,
    error_backoff: Duration,
    moderation_log_retention: ChronoDuration,
    post_view_retention: ChronoDuration,
}

impl CleanupWorker {
    pub fn new(
        posts: Arc<dyn PostStore>,
        boosts: Arc<dyn BoostScheduleStore>,
        log: Arc<dyn ModerationLogStore>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            posts,
            boosts,
            log,
            interval: Duration::from_secs(config.cleanup_interval_secs),
            error_backoff: Duration::from_secs(config.error_backoff_secs),
            moderation_log_retention: ChronoDuration::days(config.moderation_log_retention_days),
            post_view_retention: ChronoDuration::days(config.post_view_retention_days),
        }
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<CleanupStats> {
        let mut stats = CleanupStats::default();

        stats.moderation_records_purged = self
            .log
            .purge_before(now - self.moderation_log_retention)
            .await?;
        if stats.moderation_records_purged > 0 {
            tracing::info!(
                purged = stats.moderation_records_purged,
                "Purged old moderation records"
            );
        }

        stats.views_purged = self
            .posts
            .purge_views_before(now - self.post_view_retention)
            .await?;
        if stats.views_purged > 0 {
            tracing::info!(purged = stats.views_purged, "Purged old post views");
        }

        stats.schedules_deactivated = self.boosts.deactivate_departed().await?;
        if stats.schedules_deactivated > 0 {
            // Normally the expiration worker and the gate switch these off;
            // rows surfacing here escaped through a race or a manual edit.
            tracing::warn!(
                deactivated = stats.schedules_deactivated,
                "Deactivated boost schedules for posts no longer active"
            );
        }

        metrics::record_purged("moderation_records", stats.moderation_records_purged);
        metrics::record_purged("post_views", stats.views_purged);
        metrics::record_purged("boost_schedules", stats.schedules_deactivated);

        Ok(stats)
    }
}

#[async_trait]
impl Worker for CleanupWorker {
    fn name(&self) -> &'static str {
        WORKER_NAME
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Cleanup worker started"
        );

        let mut delay = self.interval;
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Cleanup worker stopping");
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
                    tracing::error!(error = %e, "Cleanup sweep failed, backing off");
                    self.error_backoff
                }
            };
            metrics::observe_sweep_duration(WORKER_NAME, started.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{
        AiDecision, AiVerdict, BoostSchedule, ModerationRecord, Post, PostStatus, PostType,
        PostView,
    };
    use uuid::Uuid;

    fn worker(store: &InMemoryStore) -> CleanupWorker {
        let config = SchedulerConfig {
            expiration_interval_secs: 3600,
            boost_interval_secs: 1800,
            cleanup_interval_secs: 86_400,
            error_backoff_secs: 60,
            moderation_log_retention_days: 30,
            post_view_retention_days: 90,
            shutdown_timeout_secs: 5,
        };
        CleanupWorker::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            &config,
        )
    }

    fn record_at(moderated_at: DateTime<Utc>) -> ModerationRecord {
        ModerationRecord::from_verdict(
            Uuid::new_v4(),
            &AiVerdict {
                decision: AiDecision::Approved,
                confidence: 0.9,
                reason: "ok".to_string(),
            },
            moderated_at,
        )
    }

    fn post_with_status(status: PostStatus) -> Post {
        let now = Utc::now();
        Post {
            id: Uuid::new_v4(),
            title: "Office chairs for sale".to_string(),
            description: "Four barely used office chairs".to_string(),
            post_type: PostType::Service,
            price: None,
            currency_id: None,
            city_id: "city-1".to_string(),
            category_id: "cat-4".to_string(),
            author_id: Uuid::new_v4(),
            status,
            package: None,
            post_lifetime_days: 30,
            expires_at: None,
            is_premium: false,
            views_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_retention_windows() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        store.put_record(record_at(now - ChronoDuration::days(31))).await;
        store.put_record(record_at(now - ChronoDuration::days(5))).await;
        store
            .put_view(PostView {
                id: Uuid::new_v4(),
                post_id: Uuid::new_v4(),
                viewed_at: now - ChronoDuration::days(91),
            })
            .await;
        store
            .put_view(PostView {
                id: Uuid::new_v4(),
                post_id: Uuid::new_v4(),
                viewed_at: now - ChronoDuration::days(89),
            })
            .await;

        let stats = worker(&store).sweep(now).await.unwrap();

        assert_eq!(stats.moderation_records_purged, 1);
        assert_eq!(stats.views_purged, 1);
        assert_eq!(store.record_count().await, 1);
        assert_eq!(store.view_count().await, 1);
    }

    #[tokio::test]
    async fn test_departed_schedules_are_deactivated() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let archived = post_with_status(PostStatus::Archived);
        let active = post_with_status(PostStatus::Active);
        let reviewing = post_with_status(PostStatus::ManualReview);
        store.put_post(archived.clone()).await;
        store.put_post(active.clone()).await;
        store.put_post(reviewing.clone()).await;

        for post in [&archived, &active, &reviewing] {
            BoostScheduleStore::insert(
                &store,
                &BoostSchedule::new(post.id, now + ChronoDuration::days(1), now),
            )
            .await
            .unwrap();
        }

        let stats = worker(&store).sweep(now).await.unwrap();

        assert_eq!(stats.schedules_deactivated, 1);
        assert!(!store.schedule_for_post(archived.id).await.unwrap().is_active);
        // Posts still live or still awaiting review keep their schedules
        assert!(store.schedule_for_post(active.id).await.unwrap().is_active);
        assert!(store.schedule_for_post(reviewing.id).await.unwrap().is_active);
    }
}
