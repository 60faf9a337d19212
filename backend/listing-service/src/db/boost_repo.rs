use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::BoostScheduleStore;
use crate::error::Result;
use crate::models::BoostSchedule;

/// Postgres implementation of [`BoostScheduleStore`]
#[derive(Clone)]
pub struct PgBoostScheduleStore {
    pool: PgPool,
}

impl PgBoostScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn schedule_from_row(row: &PgRow) -> std::result::Result<BoostSchedule, sqlx::Error> {
    Ok(BoostSchedule {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        next_boost_at: row.try_get("next_boost_at")?,
        boost_count: row.try_get("boost_count")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl BoostScheduleStore for PgBoostScheduleStore {
    async fn insert(&self, schedule: &BoostSchedule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO boost_schedules (id, post_id, next_boost_at, boost_count, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.post_id)
        .bind(schedule.next_boost_at)
        .bind(schedule.boost_count)
        .bind(schedule.is_active)
        .bind(schedule.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_post(&self, post_id: Uuid) -> Result<Option<BoostSchedule>> {
        let row = sqlx::query(
            "SELECT id, post_id, next_boost_at, boost_count, is_active, created_at \
             FROM boost_schedules WHERE post_id = $1",
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(schedule_from_row)
            .transpose()
            .map_err(Into::into)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<BoostSchedule>> {
        let rows = sqlx::query(
            r#"
            SELECT bs.id, bs.post_id, bs.next_boost_at, bs.boost_count, bs.is_active, bs.created_at
            FROM boost_schedules bs
            JOIN posts p ON p.id = bs.post_id
            WHERE bs.is_active AND bs.next_boost_at <= $1 AND p.status = 'active'
            ORDER BY bs.next_boost_at
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| schedule_from_row(row).map_err(Into::into))
            .collect()
    }

    async fn advance(
        &self,
        schedule_id: Uuid,
        next_boost_at: DateTime<Utc>,
        boost_count: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE boost_schedules SET next_boost_at = $1, boost_count = $2 \
             WHERE id = $3 AND is_active",
        )
        .bind(next_boost_at)
        .bind(boost_count)
        .bind(schedule_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate(&self, schedule_id: Uuid, boost_count: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE boost_schedules SET is_active = FALSE, boost_count = $1 WHERE id = $2",
        )
        .bind(boost_count)
        .bind(schedule_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_for_post(&self, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE boost_schedules SET is_active = FALSE WHERE post_id = $1 AND is_active",
        )
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_departed(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE boost_schedules
            SET is_active = FALSE
            WHERE is_active AND post_id IN (
                SELECT id FROM posts WHERE status IN ('blocked', 'archived')
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
