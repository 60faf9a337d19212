//! Refund trigger for rejected premium posts
//!
//! Invoked best-effort when a moderator rejects a paid listing. Settlement
//! with the payment provider happens elsewhere; this hook only flips the
//! purchase record so reconciliation can pick it up.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefundHook: Send + Sync {
    async fn on_premium_rejected(&self, post_id: Uuid, author_id: Uuid) -> Result<()>;
}

/// Marks the paid package purchase for a post as refunded
#[derive(Clone)]
pub struct PackageRefundHook {
    pool: PgPool,
}

impl PackageRefundHook {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefundHook for PackageRefundHook {
    async fn on_premium_rejected(&self, post_id: Uuid, author_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE user_packages SET payment_status = 'refunded' \
             WHERE post_id = $1 AND payment_status = 'paid'",
        )
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            tracing::info!(%post_id, %author_id, "Marked package purchase refunded");
        } else {
            tracing::warn!(%post_id, %author_id, "No paid purchase found for rejected premium post");
        }

        Ok(())
    }
}
