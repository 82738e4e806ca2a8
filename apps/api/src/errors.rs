use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Terminal pipeline failures each carry their own machine-checkable code:
/// callers present different messaging for "try again", "quota reached", and
/// "add more detail", so these must never collapse into a generic internal error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Generation output unusable after {attempts} attempts")]
    GenerationUnparseable { attempts: u32 },

    #[error("Generation stayed ungrounded after {attempts} attempts")]
    GroundingFailed { attempts: u32 },

    #[error("No grounding roles and no usable structured payload")]
    NoGrounding,

    #[error("Regeneration quota exceeded ({used}/{limit})")]
    QuotaExceeded { used: i64, limit: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The machine-checkable error code surfaced in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::GenerationUnparseable { .. } => "GENERATION_UNPARSEABLE",
            AppError::GroundingFailed { .. } => "GROUNDING_FAILED",
            AppError::NoGrounding => "NO_GROUNDING",
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::GenerationUnparseable { attempts } => (
                StatusCode::BAD_GATEWAY,
                format!(
                    "The generation service returned unusable output {attempts} times. \
                    Please try again."
                ),
            ),
            AppError::GroundingFailed { attempts } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!(
                    "Could not anchor the recommendation to known roles after \
                    {attempts} attempts. Adding more detail to your profile may help."
                ),
            ),
            AppError::NoGrounding => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Your profile matched no roles in the catalog. Please provide more detail."
                    .to_string(),
            ),
            AppError::QuotaExceeded { used, limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("You've used all {limit} regeneration turns ({used}/{limit})."),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
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
    use std::collections::HashSet;

    #[test]
    fn test_terminal_failures_have_distinct_codes() {
        // Callers branch on the code, so no two terminal kinds may alias.
        let codes: HashSet<&str> = [
            AppError::GenerationUnparseable { attempts: 3 }.code(),
            AppError::GroundingFailed { attempts: 3 }.code(),
            AppError::NoGrounding.code(),
            AppError::QuotaExceeded { used: 3, limit: 3 }.code(),
        ]
        .into_iter()
        .collect();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_quota_exceeded_is_429() {
        let response = AppError::QuotaExceeded { used: 3, limit: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_grounding_failed_is_422() {
        let response = AppError::GroundingFailed { attempts: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_unparseable_generation_is_502() {
        let response = AppError::GenerationUnparseable { attempts: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
