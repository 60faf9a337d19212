//! End-to-end lifecycle tests over the in-memory store: creation through
//! moderation, publication, promotion and expiration, including the races
//! the CAS guards are there to resolve.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use listing_service::config::SchedulerConfig;
use listing_service::db::InMemoryStore;
use listing_service::error::Result;
use listing_service::jobs::{BoostWorker, ExpirationWorker};
use listing_service::models::{
    AiVerdict, DecisionOutcome, ModerationDecision, ModeratorAction, ModeratorInfo,
    PackageSnapshot, PackageType, Post, PostStatus, PostType,
};
use listing_service::services::{
    CreatePostInput, ModerationGate, ModeratorNotifier, PostService, RefundHook,
};

/// Counts notifier calls instead of talking to Telegram.
#[derive(Default)]
struct RecordingNotifier {
    moderation_requests: AtomicUsize,
    status_updates: AtomicUsize,
}

#[async_trait]
impl ModeratorNotifier for RecordingNotifier {
    async fn send_moderation_request<'a>(
        &self,
        _post: &Post,
        _ai_verdict: Option<&'a AiVerdict>,
    ) -> Result<bool> {
        self.moderation_requests.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn send_status_update<'a>(
        &self,
        _post: &Post,
        _decision: ModerationDecision,
        _moderator: Option<&'a ModeratorInfo>,
    ) -> Result<bool> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[derive(Default)]
struct NoopRefunds {
    calls: AtomicUsize,
}

#[async_trait]
impl RefundHook for NoopRefunds {
    async fn on_premium_rejected(&self, _post_id: Uuid, _author_id: Uuid) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Harness {
    store: InMemoryStore,
    gate: Arc<ModerationGate>,
    service: PostService,
    notifier: Arc<RecordingNotifier>,
    expiration: ExpirationWorker,
    boost: BoostWorker,
}

fn scheduler_config() -> SchedulerConfig {
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

fn harness() -> Harness {
    let store = InMemoryStore::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let refunds = Arc::new(NoopRefunds::default());

    let gate = Arc::new(ModerationGate::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        None, // AI moderation disabled: everything routes to a human
        Some(notifier.clone()),
        refunds,
        0.8,
    ));

    let service = PostService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gate.clone(),
        30,
        7,
    );

    let config = scheduler_config();
    let expiration = ExpirationWorker::new(Arc::new(store.clone()), Arc::new(store.clone()), &config);
    let boost = BoostWorker::new(Arc::new(store.clone()), Arc::new(store.clone()), &config);

    Harness {
        store,
        gate,
        service,
        notifier,
        expiration,
        boost,
    }
}

fn free_job_input(author_id: Uuid) -> CreatePostInput {
    CreatePostInput {
        title: "Looking for warehouse staff".to_string(),
        description: "Night shifts, forklift license a plus".to_string(),
        post_type: PostType::Job,
        price: None,
        currency_id: None,
        city_id: "city-1".to_string(),
        category_id: "cat-9".to_string(),
        author_id,
        package: None,
    }
}

fn boost_package(interval_days: i64, duration_days: i64) -> PackageSnapshot {
    PackageSnapshot {
        package_id: Uuid::new_v4(),
        name: "Standard".to_string(),
        package_type: PackageType::Standard,
        price: 12.5,
        currency_id: "EUR".to_string(),
        duration_days,
        post_lifetime_days: 30,
        boost_interval_days: interval_days,
        has_photo: true,
        has_highlight: false,
        has_boost: true,
    }
}

#[tokio::test]
async fn test_free_post_full_lifecycle() {
    let h = harness();
    let author = Uuid::new_v4();
    let t0 = Utc::now();

    // Create: the gate routes the post to a human and pings the channel
    let created = h
        .service
        .create_post_at(free_job_input(author), t0)
        .await
        .unwrap();
    assert_eq!(created.post.status, PostStatus::ManualReview);
    assert!(created.gate_outcome.notify_moderator);
    assert_eq!(h.notifier.moderation_requests.load(Ordering::SeqCst), 1);
    assert!(created.post.expires_at.is_none());

    // Approve: the post goes live with its lifetime counted from creation
    let outcome = h
        .gate
        .apply_moderator_decision(
            created.post.id,
            ModeratorAction::Approve,
            ModeratorInfo {
                id: Some(42),
                username: Some("mod".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(outcome.applied());

    let live = h.store.post(created.post.id).await.unwrap();
    assert_eq!(live.status, PostStatus::Active);
    assert_eq!(live.expires_at.unwrap(), t0 + Duration::days(30));
    assert_eq!(h.notifier.status_updates.load(Ordering::SeqCst), 1);

    // Not expired the day before the deadline
    let stats = h
        .expiration
        .sweep(t0 + Duration::days(29))
        .await
        .unwrap();
    assert_eq!(stats.archived, 0);

    // Expired once the deadline passes
    let stats = h
        .expiration
        .sweep(t0 + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(stats.archived, 1);
    assert_eq!(
        h.store.post(created.post.id).await.unwrap().status,
        PostStatus::Archived
    );

    // Re-running the sweep is a no-op
    let stats = h
        .expiration
        .sweep(t0 + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(stats.archived, 0);
}

#[tokio::test]
async fn test_late_reject_after_archive_is_noop() {
    let h = harness();
    let t0 = Utc::now();

    let created = h
        .service
        .create_post_at(free_job_input(Uuid::new_v4()), t0)
        .await
        .unwrap();
    h.gate
        .apply_moderator_decision(
            created.post.id,
            ModeratorAction::Approve,
            ModeratorInfo::default(),
        )
        .await
        .unwrap();
    h.expiration.sweep(t0 + Duration::days(30)).await.unwrap();

    // A reject arriving after archival must not corrupt the archived state
    let outcome = h
        .gate
        .apply_moderator_decision(
            created.post.id,
            ModeratorAction::Reject,
            ModeratorInfo::default(),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DecisionOutcome::Superseded {
            current: PostStatus::Archived
        }
    );
    assert_eq!(
        h.store.post(created.post.id).await.unwrap().status,
        PostStatus::Archived
    );
}

#[tokio::test]
async fn test_boosted_post_promotion_schedule() {
    let h = harness();
    let t0 = Utc::now();

    let mut input = free_job_input(Uuid::new_v4());
    input.price = Some(12.5);
    input.currency_id = Some("EUR".to_string());
    input.package = Some(boost_package(3, 7));

    let created = h.service.create_post_at(input, t0).await.unwrap();

    // Schedule exists immediately after creation
    let schedule = h.store.schedule_for_post(created.post.id).await.unwrap();
    assert_eq!(schedule.boost_count, 0);
    assert!(schedule.is_active);
    assert_eq!(schedule.next_boost_at, t0 + Duration::days(3));

    // A pending post is never boosted even when the slot is due
    let stats = h.boost.sweep(t0 + Duration::days(3)).await.unwrap();
    assert_eq!(stats.examined, 0);

    h.gate
        .apply_moderator_decision(
            created.post.id,
            ModeratorAction::Approve,
            ModeratorInfo::default(),
        )
        .await
        .unwrap();

    // First boost refreshes recency and schedules the next slot
    let t1 = t0 + Duration::days(3);
    let stats = h.boost.sweep(t1).await.unwrap();
    assert_eq!(stats.boosted, 1);
    let post = h.store.post(created.post.id).await.unwrap();
    assert_eq!(post.updated_at, t1);
    let schedule = h.store.schedule_for_post(created.post.id).await.unwrap();
    assert_eq!(schedule.boost_count, 1);
    assert_eq!(schedule.next_boost_at, t0 + Duration::days(6));

    // Second boost exhausts the 7-day entitlement window
    let stats = h.boost.sweep(t0 + Duration::days(6)).await.unwrap();
    assert_eq!(stats.exhausted, 1);
    let schedule = h.store.schedule_for_post(created.post.id).await.unwrap();
    assert_eq!(schedule.boost_count, 2);
    assert!(!schedule.is_active);
}

#[tokio::test]
async fn test_expiration_wins_race_and_boost_schedule_is_retired() {
    let h = harness();
    let t0 = Utc::now();

    let mut input = free_job_input(Uuid::new_v4());
    input.price = Some(12.5);
    input.currency_id = Some("EUR".to_string());
    // Entitlement outlives the post so the schedule would still be active at expiry
    input.package = Some(PackageSnapshot {
        post_lifetime_days: 7,
        duration_days: 30,
        ..boost_package(3, 30)
    });

    let created = h.service.create_post_at(input, t0).await.unwrap();
    h.gate
        .apply_moderator_decision(
            created.post.id,
            ModeratorAction::Approve,
            ModeratorInfo::default(),
        )
        .await
        .unwrap();

    // Post expires at t0+7d while the boost cursor is still active
    let stats = h.expiration.sweep(t0 + Duration::days(7)).await.unwrap();
    assert_eq!(stats.archived, 1);

    let schedule = h.store.schedule_for_post(created.post.id).await.unwrap();
    assert!(!schedule.is_active);

    // A boost slot due after archival finds nothing to do
    let stats = h.boost.sweep(t0 + Duration::days(9)).await.unwrap();
    assert_eq!(stats.examined, 0);
}

#[tokio::test]
async fn test_free_quota_spans_post_lifecycles() {
    let h = harness();
    let author = Uuid::new_v4();
    let t0 = Utc::now();

    h.service
        .create_post_at(free_job_input(author), t0)
        .await
        .unwrap();

    // Throttled during cooldown even while the first post is still in review
    let availability = h
        .service
        .check_free_availability_at(author, t0 + Duration::days(3))
        .await
        .unwrap();
    assert!(!availability.can_create_free);
    assert_eq!(availability.next_free_at, Some(t0 + Duration::days(7)));

    // A different user is unaffected
    let availability = h
        .service
        .check_free_availability_at(Uuid::new_v4(), t0 + Duration::days(3))
        .await
        .unwrap();
    assert!(availability.can_create_free);

    // The original author is free again at the boundary
    let second = h
        .service
        .create_post_at(free_job_input(author), t0 + Duration::days(7))
        .await
        .unwrap();
    assert_eq!(second.post.status, PostStatus::ManualReview);
}
