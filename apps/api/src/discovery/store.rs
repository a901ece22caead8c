//! Persistence boundary for discovered postings.
//!
//! Upserts are keyed on the posting identity (stable external id, else the
//! title/company/url composite) computed in Rust and stored in a UNIQUE
//! column, so concurrent first-inserts of the same identity resolve to one
//! row via `ON CONFLICT`. Matching is two-step: a row first stored under
//! the composite key adopts the external id when a later discovery carries
//! one, rather than inserting a second row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::posting::{ExperienceLevel, JobPosting, JobSource};

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Active postings scraped since `since`, newest first.
    async fn find_recent_active(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<JobPosting>, AppError>;

    /// Inserts or updates by identity; returns the stored posting with its
    /// assigned id. Re-discovery updates mutable fields and `scraped_at`
    /// and reactivates the row.
    async fn upsert_by_identity(&self, posting: &JobPosting) -> Result<JobPosting, AppError>;

    /// Search telemetry. Fire-and-forget: failures are logged by callers
    /// and never abort a search.
    async fn record_search(
        &self,
        user_id: Option<Uuid>,
        query: &str,
        location: Option<&str>,
        result_count: i64,
    ) -> Result<(), AppError>;
}

#[derive(Debug, FromRow)]
struct JobPostingRow {
    id: Uuid,
    external_id: Option<String>,
    title: String,
    company: String,
    location: String,
    description: String,
    requirements: Vec<String>,
    url: String,
    apply_url: Option<String>,
    salary_text: Option<String>,
    salary_min: Option<i64>,
    salary_max: Option<i64>,
    employment_type: Option<String>,
    experience_level: Option<String>,
    is_remote: bool,
    source: String,
    scraped_at: DateTime<Utc>,
    is_active: bool,
}

impl From<JobPostingRow> for JobPosting {
    fn from(row: JobPostingRow) -> Self {
        JobPosting {
            id: Some(row.id),
            external_id: row.external_id,
            title: row.title,
            company: row.company,
            location: row.location,
            description: row.description,
            requirements: row.requirements,
            url: row.url,
            apply_url: row.apply_url,
            salary_text: row.salary_text,
            salary_min: row.salary_min,
            salary_max: row.salary_max,
            employment_type: row.employment_type,
            experience_level: row
                .experience_level
                .as_deref()
                .and_then(ExperienceLevel::parse),
            is_remote: row.is_remote,
            source: JobSource::parse(&row.source),
            scraped_at: row.scraped_at,
            is_active: row.is_active,
        }
    }
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_recent_active(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<JobPosting>, AppError> {
        let rows: Vec<JobPostingRow> = sqlx::query_as(
            r#"
            SELECT id, external_id, title, company, location, description,
                   requirements, url, apply_url, salary_text, salary_min,
                   salary_max, employment_type, experience_level, is_remote,
                   source, scraped_at, is_active
            FROM job_postings
            WHERE is_active = TRUE AND scraped_at >= $1
            ORDER BY scraped_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(JobPosting::from).collect())
    }

    async fn upsert_by_identity(&self, posting: &JobPosting) -> Result<JobPosting, AppError> {
        let identity = posting.identity();
        let composite = posting.composite_identity();

        // Migrate a composite-keyed row to the external id so the upsert
        // below conflicts with it instead of inserting a duplicate.
        if identity != composite {
            sqlx::query(
                r#"
                UPDATE job_postings SET identity = $1
                WHERE identity = $2
                  AND NOT EXISTS (SELECT 1 FROM job_postings p WHERE p.identity = $1)
                "#,
            )
            .bind(&identity)
            .bind(&composite)
            .execute(&self.pool)
            .await?;
        }

        let row: JobPostingRow = sqlx::query_as(
            r#"
            INSERT INTO job_postings
                (id, identity, external_id, title, company, location, description,
                 requirements, url, apply_url, salary_text, salary_min, salary_max,
                 employment_type, experience_level, is_remote, source, scraped_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, TRUE)
            ON CONFLICT (identity) DO UPDATE SET
                external_id = EXCLUDED.external_id,
                title = EXCLUDED.title,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                description = EXCLUDED.description,
                requirements = EXCLUDED.requirements,
                url = EXCLUDED.url,
                apply_url = EXCLUDED.apply_url,
                salary_text = EXCLUDED.salary_text,
                salary_min = EXCLUDED.salary_min,
                salary_max = EXCLUDED.salary_max,
                employment_type = EXCLUDED.employment_type,
                experience_level = EXCLUDED.experience_level,
                is_remote = EXCLUDED.is_remote,
                source = EXCLUDED.source,
                scraped_at = EXCLUDED.scraped_at,
                is_active = TRUE
            RETURNING id, external_id, title, company, location, description,
                      requirements, url, apply_url, salary_text, salary_min,
                      salary_max, employment_type, experience_level, is_remote,
                      source, scraped_at, is_active
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity)
        .bind(&posting.external_id)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.description)
        .bind(&posting.requirements)
        .bind(&posting.url)
        .bind(&posting.apply_url)
        .bind(&posting.salary_text)
        .bind(posting.salary_min)
        .bind(posting.salary_max)
        .bind(&posting.employment_type)
        .bind(posting.experience_level.map(|l| l.as_str()))
        .bind(posting.is_remote)
        .bind(posting.source.as_str())
        .bind(posting.scraped_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(JobPosting::from(row))
    }

    async fn record_search(
        &self,
        user_id: Option<Uuid>,
        query: &str,
        location: Option<&str>,
        result_count: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO search_log (id, user_id, query, location, result_count) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(query)
        .bind(location)
        .bind(result_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
