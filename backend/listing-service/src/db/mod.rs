/// Store contracts and implementations
///
/// Every component receives its stores through these traits instead of a
/// shared global handle, so the workers and the moderation gate can be
/// exercised against the in-memory implementation in tests while
/// production wires the Postgres repositories.
///
/// Mutating operations that race (status transitions, recency touches) are
/// compare-and-swap shaped: they name the expected pre-state and report
/// whether the row was won. Callers must not cache post rows across worker
/// ticks; the authoritative row is re-read before every guarded write.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BoostSchedule, FreePostQuota, ModerationRecord, Post, PostStatus};

pub mod boost_repo;
pub mod memory;
pub mod moderation_log_repo;
pub mod post_repo;
pub mod quota_repo;

pub use boost_repo::PgBoostScheduleStore;
pub use memory::InMemoryStore;
pub use moderation_log_repo::PgModerationLogStore;
pub use post_repo::PgPostStore;
pub use quota_repo::PgFreePostQuotaStore;

/// Persisted listings
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(&self, post: &Post) -> Result<()>;

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Compare-and-swap status update: applies `next` and stamps
    /// `updated_at` only while the current status is one of `expected`.
    /// Returns whether this caller won the row.
    async fn transition_status(
        &self,
        post_id: Uuid,
        expected: &[PostStatus],
        next: PostStatus,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// CAS to Active that also stamps `expires_at`, which is set exactly
    /// once in a post's life.
    async fn activate(
        &self,
        post_id: Uuid,
        expected: &[PostStatus],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Range scan backing the expiration sweep: Active posts whose
    /// `expires_at` has passed.
    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Post>>;

    /// Refresh `updated_at` for recency ranking, guarded on the post still
    /// being Active.
    async fn touch_active(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Append a view row and bump the monotonic counter.
    async fn record_view(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<()>;

    /// Drop view rows older than `cutoff`; returns how many were purged.
    async fn purge_views_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Promotion cursors, at most one per post
#[async_trait]
pub trait BoostScheduleStore: Send + Sync {
    async fn insert(&self, schedule: &BoostSchedule) -> Result<()>;

    async fn find_by_post(&self, post_id: Uuid) -> Result<Option<BoostSchedule>>;

    /// Range scan backing the boost sweep: active schedules due at `now`
    /// whose post is still Active.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<BoostSchedule>>;

    /// Move the cursor to the next boost slot.
    async fn advance(
        &self,
        schedule_id: Uuid,
        next_boost_at: DateTime<Utc>,
        boost_count: i64,
    ) -> Result<bool>;

    /// Entitlement exhausted: stop boosting but keep the row and its count.
    async fn deactivate(&self, schedule_id: Uuid, boost_count: i64) -> Result<bool>;

    async fn deactivate_for_post(&self, post_id: Uuid) -> Result<bool>;

    /// Hygiene: deactivate schedules whose post has left Active
    /// (Blocked or Archived). Returns how many rows changed.
    async fn deactivate_departed(&self) -> Result<u64>;
}

/// Free-tier usage records, append-only
#[async_trait]
pub trait FreePostQuotaStore: Send + Sync {
    async fn insert(&self, quota: &FreePostQuota) -> Result<()>;

    /// Most recent quota row for the user, if any.
    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<FreePostQuota>>;
}

/// Automated-moderation audit sink, append-only
#[async_trait]
pub trait ModerationLogStore: Send + Sync {
    async fn insert(&self, record: &ModerationRecord) -> Result<()>;

    /// Drop records older than `cutoff`; returns how many were purged.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
