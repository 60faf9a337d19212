//! Post creation and free-tier throttling
//!
//! Every new listing follows the same path regardless of tier: validate,
//! snapshot the package entitlements, insert as pending, then run the
//! moderation gate synchronously. Free-tier posts additionally consume the
//! per-user cooldown quota.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::db::{BoostScheduleStore, FreePostQuotaStore, PostStore};
use crate::error::{ListingError, Result};
use crate::models::{BoostSchedule, FreePostQuota, GateOutcome, PackageSnapshot, Post, PostStatus, PostType};
use crate::services::moderation::ModerationGate;

/// Input for creating a listing
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostInput {
    #[validate(length(min = 5, max = 200))]
    pub title: String,
    #[validate(length(min = 10, max = 2000))]
    pub description: String,
    pub post_type: PostType,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    pub currency_id: Option<String>,
    pub city_id: String,
    pub category_id: String,
    pub author_id: Uuid,
    /// Entitlement snapshot of the purchased package, if any
    pub package: Option<PackageSnapshot>,
}

/// Answer of the free-post throttle
#[derive(Debug, Clone, Serialize)]
pub struct FreePostAvailability {
    pub can_create_free: bool,
    pub next_free_at: Option<DateTime<Utc>>,
}

/// Result of a create call: the stored post and what the gate decided
#[derive(Debug)]
pub struct CreatedPost {
    pub post: Post,
    pub gate_outcome: GateOutcome,
}

pub struct PostService {
    posts: Arc<dyn PostStore>,
    boosts: Arc<dyn BoostScheduleStore>,
    quotas: Arc<dyn FreePostQuotaStore>,
    gate: Arc<ModerationGate>,
    default_lifetime_days: i64,
    free_post_cooldown_days: i64,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        boosts: Arc<dyn BoostScheduleStore>,
        quotas: Arc<dyn FreePostQuotaStore>,
        gate: Arc<ModerationGate>,
        default_lifetime_days: i64,
        free_post_cooldown_days: i64,
    ) -> Self {
        Self {
            posts,
            boosts,
            quotas,
            gate,
            default_lifetime_days,
            free_post_cooldown_days,
        }
    }

    /// Check whether the user may create another free-tier post.
    pub async fn check_free_availability(&self, user_id: Uuid) -> Result<FreePostAvailability> {
        self.check_free_availability_at(user_id, Utc::now()).await
    }

    pub async fn check_free_availability_at(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FreePostAvailability> {
        match self.quotas.latest_for_user(user_id).await? {
            None => Ok(FreePostAvailability {
                can_create_free: true,
                next_free_at: None,
            }),
            Some(quota) if now >= quota.next_free_post_at => Ok(FreePostAvailability {
                can_create_free: true,
                next_free_at: None,
            }),
            Some(quota) => Ok(FreePostAvailability {
                can_create_free: false,
                next_free_at: Some(quota.next_free_post_at),
            }),
        }
    }

    /// Create a listing and run it through the moderation gate.
    pub async fn create_post(&self, input: CreatePostInput) -> Result<CreatedPost> {
        self.create_post_at(input, Utc::now()).await
    }

    pub async fn create_post_at(
        &self,
        input: CreatePostInput,
        now: DateTime<Utc>,
    ) -> Result<CreatedPost> {
        input.validate()?;

        let free_tier = input.package.as_ref().map_or(true, |p| p.is_free());

        // The check-then-record pair is deliberately not atomic: two
        // simultaneous requests from one user may both pass. Acceptable
        // over-grant, not a security boundary.
        if free_tier {
            let availability = self
                .check_free_availability_at(input.author_id, now)
                .await?;
            if !availability.can_create_free {
                return Err(ListingError::FreeQuotaExhausted {
                    next_free_at: availability
                        .next_free_at
                        .unwrap_or(now),
                });
            }
        }

        let lifetime_days = input
            .package
            .as_ref()
            .map(|p| p.post_lifetime_days)
            .unwrap_or(self.default_lifetime_days);
        let is_premium = input.package.as_ref().is_some_and(|p| p.price > 0.0);

        let post = Post {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            post_type: input.post_type,
            price: input.price,
            currency_id: input.currency_id,
            city_id: input.city_id,
            category_id: input.category_id,
            author_id: input.author_id,
            status: PostStatus::PendingModeration,
            package: input.package,
            post_lifetime_days: lifetime_days,
            expires_at: None,
            is_premium,
            views_count: 0,
            created_at: now,
            updated_at: now,
        };

        self.posts.insert(&post).await?;

        if free_tier {
            let quota = FreePostQuota::new(
                post.author_id,
                now,
                Duration::days(self.free_post_cooldown_days),
            );
            self.quotas.insert(&quota).await?;
        }

        if let Some(package) = post.package.as_ref().filter(|p| p.has_boost) {
            let schedule = BoostSchedule::new(
                post.id,
                now + Duration::days(package.boost_interval_days),
                now,
            );
            self.boosts.insert(&schedule).await?;
        }

        let gate_outcome = self.gate.moderate_new_post(&post).await?;

        let post = self
            .posts
            .find_by_id(post.id)
            .await?
            .unwrap_or_else(|| {
                let mut stale = post;
                stale.status = gate_outcome.next_status;
                stale
            });

        tracing::info!(
            post_id = %post.id,
            author_id = %post.author_id,
            status = %post.status,
            premium = post.is_premium,
            "Post created"
        );

        Ok(CreatedPost { post, gate_outcome })
    }
}
