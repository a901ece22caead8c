//! Daily search quota for authenticated callers.
//!
//! Checked before any cache/store/fetch work: a non-premium user at the
//! daily allotment is rejected with a single cheap counter lookup.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;

#[async_trait]
pub trait QuotaService: Send + Sync {
    async fn is_search_allowed(&self, user_id: Uuid) -> Result<bool, AppError>;
    async fn record_search_used(&self, user_id: Uuid) -> Result<(), AppError>;
}

pub struct PgQuotaService {
    pool: PgPool,
    daily_limit: i64,
}

impl PgQuotaService {
    pub fn new(pool: PgPool, daily_limit: i64) -> Self {
        Self { pool, daily_limit }
    }
}

#[async_trait]
impl QuotaService for PgQuotaService {
    async fn is_search_allowed(&self, user_id: Uuid) -> Result<bool, AppError> {
        let is_premium: Option<bool> =
            sqlx::query_scalar("SELECT is_premium FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        // Unknown users get the non-premium allotment rather than an error;
        // authentication is an upstream concern.
        if is_premium.unwrap_or(false) {
            return Ok(true);
        }

        let used: Option<i64> =
            sqlx::query_scalar("SELECT used FROM search_usage WHERE user_id = $1 AND day = $2")
                .bind(user_id)
                .bind(Utc::now().date_naive())
                .fetch_optional(&self.pool)
                .await?;

        Ok(used.unwrap_or(0) < self.daily_limit)
    }

    async fn record_search_used(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO search_usage (user_id, day, used)
            VALUES ($1, $2, 1)
            ON CONFLICT (user_id, day) DO UPDATE SET used = search_usage.used + 1
            "#,
        )
        .bind(user_id)
        .bind(Utc::now().date_naive())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
