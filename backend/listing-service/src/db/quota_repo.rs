use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::FreePostQuotaStore;
use crate::error::Result;
use crate::models::FreePostQuota;

/// Postgres implementation of [`FreePostQuotaStore`]
#[derive(Clone)]
pub struct PgFreePostQuotaStore {
    pool: PgPool,
}

impl PgFreePostQuotaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FreePostQuotaStore for PgFreePostQuotaStore {
    async fn insert(&self, quota: &FreePostQuota) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_free_posts (id, user_id, created_at, next_free_post_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(quota.id)
        .bind(quota.user_id)
        .bind(quota.created_at)
        .bind(quota.next_free_post_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_user(&self, user_id: Uuid) -> Result<Option<FreePostQuota>> {
        let row = sqlx::query(
            "SELECT id, user_id, created_at, next_free_post_at \
             FROM user_free_posts WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some(row) => Some(FreePostQuota {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                created_at: row.try_get("created_at")?,
                next_free_post_at: row.try_get("next_free_post_at")?,
            }),
            None => None,
        })
    }
}
