use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ModerationLogStore;
use crate::error::Result;
use crate::models::ModerationRecord;

/// Postgres implementation of [`ModerationLogStore`]
#[derive(Clone)]
pub struct PgModerationLogStore {
    pool: PgPool,
}

impl PgModerationLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModerationLogStore for PgModerationLogStore {
    async fn insert(&self, record: &ModerationRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO moderation_log (id, post_id, decision, confidence, reason, moderated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(record.post_id)
        .bind(record.decision.as_str())
        .bind(record.confidence)
        .bind(&record.reason)
        .bind(record.moderated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM moderation_log WHERE moderated_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
