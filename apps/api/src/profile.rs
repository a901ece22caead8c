//! Read-only access to candidate profiles for relevance scoring.
//! The profile subsystem owns these rows; the pipeline only reads them.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{CandidateProfile, ExperienceEntry};

#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn candidate_profile(&self, user_id: Uuid)
        -> Result<Option<CandidateProfile>, AppError>;
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    summary: String,
    skills: Vec<String>,
    experience: serde_json::Value,
}

pub struct PgProfileService {
    pool: PgPool,
}

impl PgProfileService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileService for PgProfileService {
    async fn candidate_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CandidateProfile>, AppError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT summary, skills, experience FROM candidate_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let experience: Vec<ExperienceEntry> = serde_json::from_value(row.experience)
                .unwrap_or_else(|e| {
                    warn!("Malformed experience JSON for user {user_id}: {e}");
                    vec![]
                });
            CandidateProfile {
                summary: row.summary,
                skills: row.skills,
                experience,
            }
        }))
    }
}
