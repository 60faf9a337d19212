use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::PostStore;
use crate::error::Result;
use crate::models::{PackageSnapshot, Post, PostStatus, PostType};

const POST_COLUMNS: &str = "id, title, description, post_type, price, currency_id, city_id, \
     category_id, author_id, status, package, post_lifetime_days, expires_at, is_premium, \
     views_count, created_at, updated_at";

/// Postgres implementation of [`PostStore`]
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
}

impl PgPostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &PgRow) -> std::result::Result<Post, sqlx::Error> {
    let status_raw: String = row.try_get("status")?;
    let status = PostStatus::parse(&status_raw)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown post status '{status_raw}'").into()))?;

    let type_raw: String = row.try_get("post_type")?;
    let post_type = PostType::parse(&type_raw)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown post type '{type_raw}'").into()))?;

    let package: Option<sqlx::types::Json<PackageSnapshot>> = row.try_get("package")?;

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        post_type,
        price: row.try_get("price")?,
        currency_id: row.try_get("currency_id")?,
        city_id: row.try_get("city_id")?,
        category_id: row.try_get("category_id")?,
        author_id: row.try_get("author_id")?,
        status,
        package: package.map(|json| json.0),
        post_lifetime_days: row.try_get("post_lifetime_days")?,
        expires_at: row.try_get("expires_at")?,
        is_premium: row.try_get("is_premium")?,
        views_count: row.try_get("views_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn status_strings(expected: &[PostStatus]) -> Vec<String> {
    expected.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn insert(&self, post: &Post) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, description, post_type, price, currency_id, city_id,
                               category_id, author_id, status, package, post_lifetime_days,
                               expires_at, is_premium, views_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.post_type.as_str())
        .bind(post.price)
        .bind(&post.currency_id)
        .bind(&post.city_id)
        .bind(&post.category_id)
        .bind(post.author_id)
        .bind(post.status.as_str())
        .bind(post.package.as_ref().map(sqlx::types::Json))
        .bind(post.post_lifetime_days)
        .bind(post.expires_at)
        .bind(post.is_premium)
        .bind(post.views_count)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(post_from_row).transpose().map_err(Into::into)
    }

    async fn transition_status(
        &self,
        post_id: Uuid,
        expected: &[PostStatus],
        next: PostStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = $1, updated_at = $2
            WHERE id = $3 AND status = ANY($4)
            "#,
        )
        .bind(next.as_str())
        .bind(now)
        .bind(post_id)
        .bind(status_strings(expected))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn activate(
        &self,
        post_id: Uuid,
        expected: &[PostStatus],
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = 'active', expires_at = $1, updated_at = $2
            WHERE id = $3 AND status = ANY($4)
            "#,
        )
        .bind(expires_at)
        .bind(now)
        .bind(post_id)
        .bind(status_strings(expected))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE status = 'active' AND expires_at <= $1 \
             ORDER BY expires_at"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| post_from_row(row).map_err(Into::into))
            .collect()
    }

    async fn touch_active(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE posts SET updated_at = $1 WHERE id = $2 AND status = 'active'",
        )
        .bind(now)
        .bind(post_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_view(&self, post_id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO post_views (id, post_id, viewed_at) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(post_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE posts SET views_count = views_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn purge_views_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM post_views WHERE viewed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
