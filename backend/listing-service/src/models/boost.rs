use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Promotion cursor for a post, at most one row per post.
///
/// Created together with the post when its package grants boosting.
/// Deactivated, never deleted, so `boost_count` stays auditable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostSchedule {
    pub id: Uuid,
    pub post_id: Uuid,
    pub next_boost_at: DateTime<Utc>,
    pub boost_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl BoostSchedule {
    pub fn new(post_id: Uuid, next_boost_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            next_boost_at,
            boost_count: 0,
            is_active: true,
            created_at: now,
        }
    }
}

/// One row appended per free-tier post created; the throttle always reads
/// the most recent row for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreePostQuota {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub next_free_post_at: DateTime<Utc>,
}

impl FreePostQuota {
    pub fn new(user_id: Uuid, now: DateTime<Utc>, cooldown: chrono::Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: now,
            next_free_post_at: now + cooldown,
        }
    }
}
