//! Moderation gate
//!
//! Runs the automated decision policy for freshly created posts and applies
//! human moderator decisions. The automated check is a fast-path filter for
//! clear abuse only: it blocks outright solely on a high-confidence
//! rejection. Approvals, low-confidence rejections and moderation-service
//! outages all land in front of a human instead.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{BoostScheduleStore, ModerationLogStore, PostStore};
use crate::error::{ListingError, Result};
use crate::models::{
    AiDecision, AiVerdict, DecisionOutcome, GateOutcome, ModerationDecision, ModerationRecord,
    ModeratorAction, ModeratorInfo, Post, PostStatus,
};
use crate::services::ai_moderator::AiModerator;
use crate::services::notifier::ModeratorNotifier;
use crate::services::refunds::RefundHook;

pub struct ModerationGate {
    posts: Arc<dyn PostStore>,
    boosts: Arc<dyn BoostScheduleStore>,
    log: Arc<dyn ModerationLogStore>,
    moderator: Option<Arc<dyn AiModerator>>,
    notifier: Option<Arc<dyn ModeratorNotifier>>,
    refunds: Arc<dyn RefundHook>,
    /// Rejections must exceed this confidence to block without a human
    auto_block_confidence: f32,
}

impl ModerationGate {
    pub fn new(
        posts: Arc<dyn PostStore>,
        boosts: Arc<dyn BoostScheduleStore>,
        log: Arc<dyn ModerationLogStore>,
        moderator: Option<Arc<dyn AiModerator>>,
        notifier: Option<Arc<dyn ModeratorNotifier>>,
        refunds: Arc<dyn RefundHook>,
        auto_block_confidence: f32,
    ) -> Self {
        Self {
            posts,
            boosts,
            log,
            moderator,
            notifier,
            refunds,
            auto_block_confidence,
        }
    }

    /// Run the decision policy for a post. No store writes happen here.
    pub async fn evaluate(&self, post: &Post) -> GateOutcome {
        let verdict = match &self.moderator {
            Some(moderator) => {
                match moderator
                    .moderate(&post.title, &post.description, post.post_type)
                    .await
                {
                    Ok(verdict) => Some(verdict),
                    Err(e) => {
                        // Fail open: an unreachable moderation service must
                        // neither block nor silently publish a listing.
                        tracing::warn!(
                            post_id = %post.id,
                            error = %e,
                            "AI moderation unavailable, falling back to manual review"
                        );
                        Some(AiVerdict::soft_pass(format!(
                            "AI moderation unavailable: {e}"
                        )))
                    }
                }
            }
            None => None,
        };

        if let Some(verdict) = &verdict {
            if verdict.decision == AiDecision::Rejected
                && verdict.confidence > self.auto_block_confidence
            {
                return GateOutcome {
                    decision: ModerationDecision::Rejected,
                    ai_verdict: Some(verdict.clone()),
                    notify_moderator: false,
                    next_status: PostStatus::Blocked,
                };
            }
        }

        GateOutcome {
            decision: ModerationDecision::ManualReview,
            ai_verdict: verdict,
            notify_moderator: true,
            next_status: PostStatus::ManualReview,
        }
    }

    /// Evaluate a freshly created post and persist the outcome: audit
    /// record, status transition from PendingModeration, moderator
    /// notification.
    pub async fn moderate_new_post(&self, post: &Post) -> Result<GateOutcome> {
        let outcome = self.evaluate(post).await;
        let now = Utc::now();

        if let Some(verdict) = &outcome.ai_verdict {
            self.log
                .insert(&ModerationRecord::from_verdict(post.id, verdict, now))
                .await?;
        }

        let moved = self
            .posts
            .transition_status(
                post.id,
                &[PostStatus::PendingModeration],
                outcome.next_status,
                now,
            )
            .await?;
        if !moved {
            tracing::warn!(
                post_id = %post.id,
                next_status = %outcome.next_status,
                "Post left pending moderation before the gate finished; keeping current status"
            );
        }

        if outcome.next_status == PostStatus::Blocked {
            self.boosts.deactivate_for_post(post.id).await?;
        }

        if outcome.notify_moderator {
            if let Some(notifier) = &self.notifier {
                if let Err(e) = notifier
                    .send_moderation_request(post, outcome.ai_verdict.as_ref())
                    .await
                {
                    tracing::warn!(post_id = %post.id, error = %e, "Moderator notification failed");
                }
            }
        }

        Ok(outcome)
    }

    /// Apply a human moderator decision.
    ///
    /// The transition is a compare-and-swap on the current status: it only
    /// succeeds while the post is still awaiting moderation. A decision
    /// that arrives after the post moved on (archived by the expiration
    /// worker, or decided by another moderator) is reported as superseded,
    /// never applied over the newer state.
    pub async fn apply_moderator_decision(
        &self,
        post_id: Uuid,
        action: ModeratorAction,
        moderator: ModeratorInfo,
    ) -> Result<DecisionOutcome> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(ListingError::PostNotFound(post_id))?;

        let expected = [PostStatus::PendingModeration, PostStatus::ManualReview];
        let now = Utc::now();

        let (won, new_status, decision) = match action {
            ModeratorAction::Approve => {
                let expires_at = post.expiry_from_creation();
                let won = self
                    .posts
                    .activate(post_id, &expected, expires_at, now)
                    .await?;
                (won, PostStatus::Active, ModerationDecision::Approved)
            }
            ModeratorAction::Reject => {
                let won = self
                    .posts
                    .transition_status(post_id, &expected, PostStatus::Blocked, now)
                    .await?;
                (won, PostStatus::Blocked, ModerationDecision::Rejected)
            }
        };

        if !won {
            let current = self
                .posts
                .find_by_id(post_id)
                .await?
                .map(|p| p.status)
                .unwrap_or(post.status);
            tracing::info!(
                %post_id,
                %current,
                moderator = %moderator.display_name(),
                "Moderator decision superseded by a newer transition; recorded as no-op"
            );
            return Ok(DecisionOutcome::Superseded { current });
        }

        if new_status == PostStatus::Blocked {
            self.boosts.deactivate_for_post(post_id).await?;

            if post.is_premium {
                // Refund reconciliation is eventually consistent; a failed
                // hook never rolls the moderation decision back.
                if let Err(e) = self
                    .refunds
                    .on_premium_rejected(post_id, post.author_id)
                    .await
                {
                    tracing::error!(%post_id, error = %e, "Refund hook failed for rejected premium post");
                }
            }
        }

        tracing::info!(
            %post_id,
            %new_status,
            moderator = %moderator.display_name(),
            "Moderator decision applied"
        );

        if let Some(notifier) = &self.notifier {
            let mut updated = post;
            updated.status = new_status;
            updated.updated_at = now;
            if let Err(e) = notifier
                .send_status_update(&updated, decision, Some(&moderator))
                .await
            {
                tracing::warn!(%post_id, error = %e, "Status update notification failed");
            }
        }

        Ok(DecisionOutcome::Applied { new_status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::{PackageSnapshot, PackageType, PostType};
    use crate::services::ai_moderator::MockAiModerator;
    use crate::services::notifier::MockModeratorNotifier;
    use crate::services::refunds::MockRefundHook;
    use chrono::{Duration, Utc};

    fn pending_post(package: Option<PackageSnapshot>) -> Post {
        let now = Utc::now();
        let is_premium = package.as_ref().is_some_and(|p| p.price > 0.0);
        Post {
            id: Uuid::new_v4(),
            title: "Looking for a backend engineer".to_string(),
            description: "Remote contract, three months".to_string(),
            post_type: PostType::Job,
            price: None,
            currency_id: None,
            city_id: "city-1".to_string(),
            category_id: "cat-1".to_string(),
            author_id: Uuid::new_v4(),
            status: PostStatus::PendingModeration,
            package,
            post_lifetime_days: 30,
            expires_at: None,
            is_premium,
            views_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn premium_package() -> PackageSnapshot {
        PackageSnapshot {
            package_id: Uuid::new_v4(),
            name: "Premium".to_string(),
            package_type: PackageType::Premium,
            price: 19.99,
            currency_id: "EUR".to_string(),
            duration_days: 7,
            post_lifetime_days: 30,
            boost_interval_days: 3,
            has_photo: true,
            has_highlight: true,
            has_boost: true,
        }
    }

    fn gate_with(
        store: &InMemoryStore,
        moderator: Option<Arc<dyn AiModerator>>,
        notifier: Option<Arc<dyn ModeratorNotifier>>,
        refunds: Arc<dyn RefundHook>,
    ) -> ModerationGate {
        ModerationGate::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            moderator,
            notifier,
            refunds,
            0.8,
        )
    }

    fn rejecting_moderator(confidence: f32) -> Arc<dyn AiModerator> {
        let mut mock = MockAiModerator::new();
        mock.expect_moderate().returning(move |_, _, _| {
            Ok(AiVerdict {
                decision: AiDecision::Rejected,
                confidence,
                reason: "prohibited goods".to_string(),
            })
        });
        Arc::new(mock)
    }

    fn approving_moderator() -> Arc<dyn AiModerator> {
        let mut mock = MockAiModerator::new();
        mock.expect_moderate().returning(|_, _, _| {
            Ok(AiVerdict {
                decision: AiDecision::Approved,
                confidence: 0.95,
                reason: "clean listing".to_string(),
            })
        });
        Arc::new(mock)
    }

    fn failing_moderator() -> Arc<dyn AiModerator> {
        let mut mock = MockAiModerator::new();
        mock.expect_moderate()
            .returning(|_, _, _| Err(ListingError::Moderation("connection refused".to_string())));
        Arc::new(mock)
    }

    fn silent_notifier() -> Arc<dyn ModeratorNotifier> {
        let mut mock = MockModeratorNotifier::new();
        mock.expect_send_moderation_request()
            .returning(|_, _| Ok(true));
        mock.expect_send_status_update().returning(|_, _, _| Ok(true));
        Arc::new(mock)
    }

    fn unused_refunds() -> Arc<dyn RefundHook> {
        Arc::new(MockRefundHook::new())
    }

    #[tokio::test]
    async fn test_high_confidence_rejection_blocks_without_human() {
        let store = InMemoryStore::new();
        let post = pending_post(None);
        store.put_post(post.clone()).await;

        let gate = gate_with(&store, Some(rejecting_moderator(0.95)), None, unused_refunds());
        let outcome = gate.moderate_new_post(&post).await.unwrap();

        assert_eq!(outcome.decision, ModerationDecision::Rejected);
        assert!(!outcome.notify_moderator);
        assert_eq!(store.post(post.id).await.unwrap().status, PostStatus::Blocked);
        assert_eq!(store.moderation_records(post.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_low_confidence_rejection_goes_to_human() {
        let store = InMemoryStore::new();
        let post = pending_post(None);
        store.put_post(post.clone()).await;

        let mut notifier = MockModeratorNotifier::new();
        notifier
            .expect_send_moderation_request()
            .times(1)
            .returning(|_, _| Ok(true));
        let gate = gate_with(
            &store,
            Some(rejecting_moderator(0.6)),
            Some(Arc::new(notifier)),
            unused_refunds(),
        );

        let outcome = gate.moderate_new_post(&post).await.unwrap();
        assert_eq!(outcome.decision, ModerationDecision::ManualReview);
        assert_eq!(
            store.post(post.id).await.unwrap().status,
            PostStatus::ManualReview
        );
    }

    #[tokio::test]
    async fn test_approval_still_routed_to_human() {
        let store = InMemoryStore::new();
        let post = pending_post(None);
        store.put_post(post.clone()).await;

        let gate = gate_with(
            &store,
            Some(approving_moderator()),
            Some(silent_notifier()),
            unused_refunds(),
        );
        let outcome = gate.moderate_new_post(&post).await.unwrap();

        assert_eq!(outcome.decision, ModerationDecision::ManualReview);
        assert!(outcome.notify_moderator);
        assert_eq!(
            store.post(post.id).await.unwrap().status,
            PostStatus::ManualReview
        );
    }

    #[tokio::test]
    async fn test_moderation_outage_fails_open_to_manual_review() {
        let store = InMemoryStore::new();
        let post = pending_post(None);
        store.put_post(post.clone()).await;

        let gate = gate_with(
            &store,
            Some(failing_moderator()),
            Some(silent_notifier()),
            unused_refunds(),
        );
        let outcome = gate.moderate_new_post(&post).await.unwrap();

        assert_eq!(outcome.decision, ModerationDecision::ManualReview);
        let verdict = outcome.ai_verdict.unwrap();
        assert_eq!(verdict.decision, AiDecision::Approved);
        assert_eq!(verdict.confidence, 0.5);
        // The soft pass is still audited
        assert_eq!(store.moderation_records(post.id).await.len(), 1);
        assert_eq!(
            store.post(post.id).await.unwrap().status,
            PostStatus::ManualReview
        );
    }

    #[tokio::test]
    async fn test_approve_sets_expiry_from_creation() {
        let store = InMemoryStore::new();
        let mut post = pending_post(None);
        post.status = PostStatus::ManualReview;
        store.put_post(post.clone()).await;

        let gate = gate_with(&store, None, None, unused_refunds());
        let outcome = gate
            .apply_moderator_decision(post.id, ModeratorAction::Approve, ModeratorInfo::default())
            .await
            .unwrap();

        assert!(outcome.applied());
        let stored = store.post(post.id).await.unwrap();
        assert_eq!(stored.status, PostStatus::Active);
        assert_eq!(
            stored.expires_at.unwrap(),
            post.created_at + Duration::days(30)
        );
    }

    #[tokio::test]
    async fn test_reject_premium_invokes_refund_hook() {
        let store = InMemoryStore::new();
        let mut post = pending_post(Some(premium_package()));
        post.status = PostStatus::ManualReview;
        store.put_post(post.clone()).await;

        let mut refunds = MockRefundHook::new();
        refunds
            .expect_on_premium_rejected()
            .times(1)
            .returning(|_, _| Ok(()));

        let gate = gate_with(&store, None, None, Arc::new(refunds));
        let outcome = gate
            .apply_moderator_decision(post.id, ModeratorAction::Reject, ModeratorInfo::default())
            .await
            .unwrap();

        assert!(outcome.applied());
        assert_eq!(store.post(post.id).await.unwrap().status, PostStatus::Blocked);
    }

    #[tokio::test]
    async fn test_refund_failure_does_not_block_rejection() {
        let store = InMemoryStore::new();
        let mut post = pending_post(Some(premium_package()));
        post.status = PostStatus::ManualReview;
        store.put_post(post.clone()).await;

        let mut refunds = MockRefundHook::new();
        refunds
            .expect_on_premium_rejected()
            .returning(|_, _| Err(ListingError::Internal("payment provider down".to_string())));

        let gate = gate_with(&store, None, None, Arc::new(refunds));
        let outcome = gate
            .apply_moderator_decision(post.id, ModeratorAction::Reject, ModeratorInfo::default())
            .await
            .unwrap();

        assert!(outcome.applied());
        assert_eq!(store.post(post.id).await.unwrap().status, PostStatus::Blocked);
    }

    #[tokio::test]
    async fn test_decision_on_archived_post_is_superseded() {
        let store = InMemoryStore::new();
        let mut post = pending_post(None);
        post.status = PostStatus::Archived;
        store.put_post(post.clone()).await;

        let gate = gate_with(&store, None, None, unused_refunds());
        let outcome = gate
            .apply_moderator_decision(post.id, ModeratorAction::Reject, ModeratorInfo::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            DecisionOutcome::Superseded {
                current: PostStatus::Archived
            }
        );
        // The archived status is untouched
        assert_eq!(
            store.post(post.id).await.unwrap().status,
            PostStatus::Archived
        );
    }

    #[tokio::test]
    async fn test_decision_on_missing_post_is_an_error() {
        let store = InMemoryStore::new();
        let gate = gate_with(&store, None, None, unused_refunds());

        let err = gate
            .apply_moderator_decision(
                Uuid::new_v4(),
                ModeratorAction::Approve,
                ModeratorInfo::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ListingError::PostNotFound(_)));
    }
}
