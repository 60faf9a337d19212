//! In-memory store used by unit and integration tests.
//!
//! Implements every store trait over a single locked state so tests can
//! drive the workers and the moderation gate deterministically, including
//! the CAS races the Postgres repositories resolve with guarded UPDATEs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BoostScheduleStore, FreePostQuotaStore, ModerationLogStore, PostStore};
use crate::error::{ListingError, Result};
use crate::models::{BoostSchedule, FreePostQuota, ModerationRecord, Post, PostStatus, PostView};

#[derive(Default)]
struct State {
    posts: HashMap<Uuid, Post>,
    schedules: HashMap<Uuid, BoostSchedule>,
    quotas: Vec<FreePostQuota>,
    records: Vec<ModerationRecord>,
    views: Vec<PostView>,
    /// Post ids whose guarded writes fail, for partial-failure tests
    failing_posts: HashSet<Uuid>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every guarded write against `post_id` fail with a storage error.
    pub async fn fail_writes_for(&self, post_id: Uuid) {
        self.state.write().await.failing_posts.insert(post_id);
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failing_posts.clear();
    }

    pub async fn post(&self, post_id: Uuid) -> Option<Post> {
        self.state.read().await.posts.get(&post_id).cloned()
    }

    pub async fn schedule_for_post(&self, post_id: Uuid) -> Option<BoostSchedule> {
        self.state
            .read()
            .await
            .schedules
            .values()
            .find(|s| s.post_id == post_id)
            .cloned()
    }

    pub async fn moderation_records(&self, post_id: Uuid) -> Vec<ModerationRecord> {
        self.state
            .read()
            .await
            .records
            .iter()
            .filter(|r| r.post_id == post_id)
            .cloned()
            .collect()
    }

    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn view_count(&self) -> usize {
        self.state.read().await.views.len()
    }

    /// Seed helpers for tests that need to start mid-lifecycle.
    pub async fn put_post(&self, post: Post) {
        self.state.write().await.posts.insert(post.id, post);
    }

    pub async fn put_record(&self, record: ModerationRecord) {
        self.state.write().await.records.push(record);
    }

    pub async fn put_view(&self, view: PostView) {
        self.state.write().await.views.push(view);
    }

    fn check_failing(state: &State, post_id: Uuid) -> Result<()> {
        if state.failing_posts.contains(&post_id) {
            return Err(ListingError::Internal(format!(
                "injected storage failure for post {post_id}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert(&self, post: &Post) -> Result<()> {
        self.state
            .write()
            .await
            .posts
            .insert(post.id, post.clone());
        Ok(())
    }

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn transition_status(
        &self,
        post_id: Uuid,
        expected: &[PostStatus],
        next: PostStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        Self::check_failing(&state, post_id)?;

        match state.posts.get_mut(&post_id) {
            Some(post) if expected.contains(&post.status) => {
                post.status = next;
                post.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn activate(
        &self,
        post_id: Uuid,
        expected: &[PostStatus],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        Self::check_failing(&state, post_id)?;

        match state.posts.get_mut(&post_id) {
            Some(post) if expected.contains(&post.status) => {
                post.status = PostStatus::Active;
                post.expires_at = Some(expires_at);
                post.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut expired: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.status == PostStatus::Active)
            .filter(|p| p.expires_at.is_some_and(|at| at <= now))
            .cloned()
            .collect();
        expired.sort_by_key(|p| p.expires_at);
        Ok(expired)
    }

    async fn touch_active(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.write().await;
        Self::check_failing(&state, post_id)?;

        match state.posts.get_mut(&post_id) {
            Some(post) if post.status == PostStatus::Active => {
                post.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_view(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write().await;
        state.views.push(PostView {
            id: Uuid::new_v4(),
            post_id,
            viewed_at: now,
        });
        if let Some(post) = state.posts.get_mut(&post_id) {
            post.views_count += 1;
        }
        Ok(())
    }

    async fn purge_views_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.views.len();
        state.views.retain(|v| v.viewed_at >= cutoff);
        Ok((before - state.views.len()) as u64)
    }
}

#[async_trait]
impl BoostScheduleStore for InMemoryStore {
    async fn insert(&self, schedule: &BoostSchedule) -> Result<()> {
        self.state
            .write()
            .await
            .schedules
            .insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn find_by_post(&self, post_id: Uuid) -> Result<Option<BoostSchedule>> {
        Ok(self
            .state
            .read()
            .await
            .schedules
            .values()
            .find(|s| s.post_id == post_id)
            .cloned())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<BoostSchedule>> {
        let state = self.state.read().await;
        let mut due: Vec<BoostSchedule> = state
            .schedules
            .values()
            .filter(|s| s.is_active && s.next_boost_at <= now)
            .filter(|s| {
                state
                    .posts
                    .get(&s.post_id)
                    .is_some_and(|p| p.status == PostStatus::Active)
            })
            .cloned()
            .collect();
        due.sort_by_key(|s| s.next_boost_at);
        Ok(due)
    }

    async fn advance(
        &self,
        schedule_id: Uuid,
        next_boost_at: DateTime<Utc>,
        boost_count: i64,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.schedules.get_mut(&schedule_id) {
            Some(schedule) if schedule.is_active => {
                schedule.next_boost_at = next_boost_at;
                schedule.boost_count = boost_count;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate(&self, schedule_id: Uuid, boost_count: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.schedules.get_mut(&schedule_id) {
            Some(schedule) => {
                schedule.is_active = false;
                schedule.boost_count = boost_count;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn deactivate_for_post(&self, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let mut changed = false;
        for schedule in state.schedules.values_mut() {
            if schedule.post_id == post_id && schedule.is_active {
                schedule.is_active = false;
                changed = true;
            }
        }
        Ok(changed)
    }

    async fn deactivate_departed(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let departed: HashSet<Uuid> = state
            .posts
            .values()
            .filter(|p| matches!(p.status, PostStatus::Blocked | PostStatus::Archived))
            .map(|p| p.id)
            .collect();

        let mut changed = 0;
        for schedule in state.schedules.values_mut() {
            if schedule.is_active && departed.contains(&schedule.post_id) {
                schedule.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl FreePostQuotaStore for InMemoryStore {
    async fn insert(&self, quota: &FreePostQuota) -> Result<()> {
        self.state.write().await.quotas.push(quota.clone());
        Ok(())
    }

    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<FreePostQuota>> {
        Ok(self
            .state
            .read()
            .await
            .quotas
            .iter()
            .filter(|q| q.user_id == user_id)
            .max_by_key(|q| q.created_at)
            .cloned())
    }
}

#[async_trait]
impl ModerationLogStore for InMemoryStore {
    async fn insert(&self, record: &ModerationRecord) -> Result<()> {
        self.state.write().await.records.push(record.clone());
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.records.len();
        state.records.retain(|r| r.moderated_at >= cutoff);
        Ok((before - state.records.len()) as u64)
    }
}
