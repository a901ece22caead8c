use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Daily search quota exceeded")]
    QuotaExceeded,

    #[error("Job sources unavailable")]
    SourceUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidQuery(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_QUERY", msg.clone())
            }
            AppError::QuotaExceeded => (
                StatusCode::TOO_MANY_REQUESTS,
                "QUOTA_EXCEEDED",
                "Daily search limit reached. Try again tomorrow.".to_string(),
            ),
            AppError::SourceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SOURCE_UNAVAILABLE",
                "Job sources are unavailable right now. Retry later.".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_maps_to_429() {
        let resp = AppError::QuotaExceeded.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_source_unavailable_maps_to_503() {
        let resp = AppError::SourceUnavailable.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_invalid_query_maps_to_400() {
        let resp = AppError::InvalidQuery("query text is required".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
