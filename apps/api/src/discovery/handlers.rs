use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::posting::{ScoredPosting, SearchFilters};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// Absent for anonymous searches (no quota accounting, no scoring).
    pub user_id: Option<Uuid>,
    pub query: String,
    pub location: Option<String>,
    #[serde(default)]
    pub filters: SearchFilters,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub jobs: Vec<ScoredPosting>,
    pub total: usize,
    pub cached: bool,
}

/// POST /api/v1/jobs/search
pub async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let outcome = state
        .orchestrator
        .discover_jobs(
            req.user_id,
            &req.query,
            req.location.as_deref(),
            &req.filters,
        )
        .await?;

    Ok(Json(SearchResponse {
        total: outcome.jobs.len(),
        cached: outcome.from_cache,
        jobs: outcome.jobs,
    }))
}
