use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::package::PackageSnapshot;

/// Lifecycle status of a post
///
/// Replaces the numeric status codes of the legacy backend with a closed
/// enum. All transitions go through [`PostStatus::can_transition_to`];
/// anything not listed there is a bug, not a new feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Created but not yet submitted (paid post awaiting payment)
    Draft,
    /// Submitted, automated moderation has not finished
    PendingModeration,
    /// Waiting for a human moderator
    ManualReview,
    /// Live and visible to users
    Active,
    /// Rejected by moderation; terminal
    Blocked,
    /// Expired; terminal
    Archived,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::PendingModeration => "pending_moderation",
            PostStatus::ManualReview => "manual_review",
            PostStatus::Active => "active",
            PostStatus::Blocked => "blocked",
            PostStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PostStatus::Draft),
            "pending_moderation" => Some(PostStatus::PendingModeration),
            "manual_review" => Some(PostStatus::ManualReview),
            "active" => Some(PostStatus::Active),
            "blocked" => Some(PostStatus::Blocked),
            "archived" => Some(PostStatus::Archived),
            _ => None,
        }
    }

    /// Exhaustive transition table for the post lifecycle
    pub fn can_transition_to(&self, next: PostStatus) -> bool {
        use PostStatus::*;
        match (self, next) {
            (Draft, PendingModeration) => true,
            (PendingModeration, ManualReview) => true,
            (PendingModeration, Active) => true,
            (PendingModeration, Blocked) => true,
            (ManualReview, Active) => true,
            (ManualReview, Blocked) => true,
            (Active, Archived) => true,
            (Active, Blocked) => true,
            // Blocked and Archived are terminal
            _ => false,
        }
    }

    /// States a moderator decision may still act on
    pub fn awaiting_moderation(&self) -> bool {
        matches!(self, PostStatus::PendingModeration | PostStatus::ManualReview)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Listing type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Job,
    Service,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Job => "job",
            PostType::Service => "service",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "job" => Some(PostType::Job),
            "service" => Some(PostType::Service),
            _ => None,
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub post_type: PostType,
    pub price: Option<f64>,
    pub currency_id: Option<String>,
    pub city_id: String,
    pub category_id: String,
    pub author_id: Uuid,
    pub status: PostStatus,
    /// Entitlement snapshot taken from the package at creation time
    pub package: Option<PackageSnapshot>,
    pub post_lifetime_days: i64,
    /// Set exactly once, when the post first reaches Active
    pub expires_at: Option<DateTime<Utc>>,
    pub is_premium: bool,
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Expiry a post gets when it goes live: lifetime counted from creation,
    /// not from activation.
    pub fn expiry_from_creation(&self) -> DateTime<Utc> {
        self.created_at + Duration::days(self.post_lifetime_days)
    }

    /// True when the post was created without a paid package
    pub fn is_free_tier(&self) -> bool {
        match &self.package {
            None => true,
            Some(pkg) => pkg.is_free(),
        }
    }
}

/// A single recorded view of a post, purged after a retention window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}
