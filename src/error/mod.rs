//! Unified error handling for Plangate Core

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Dependency in use: {0}")]
    DependencyInUse(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Infrastructure failure while evaluating a permission. Never surfaced to
    /// callers of the evaluator; they receive a deny instead.
    #[error("Evaluation failure: {0}")]
    EvaluationFailure(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Classify a write error against `entity`.
    ///
    /// Unique violations become `Duplicate`. Foreign key violations become
    /// `NotFound` on insert (missing parent) and `DependencyInUse` on delete.
    pub(crate) fn from_write(err: sqlx::Error, entity: &str, on_delete: bool) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Duplicate(format!("{} already exists", entity));
            }
            if db_err.is_foreign_key_violation() {
                return if on_delete {
                    AppError::DependencyInUse(format!(
                        "{} is still referenced by other records",
                        entity
                    ))
                } else {
                    AppError::NotFound(format!("Referenced record for {} not found", entity))
                };
            }
        }
        AppError::Database(err)
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Duplicate(msg) => (StatusCode::CONFLICT, "duplicate", msg.clone()),
            AppError::DependencyInUse(msg) => {
                (StatusCode::CONFLICT, "dependency_in_use", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Forbidden(msg) => {
                tracing::debug!("Request forbidden: {}", msg);
                (StatusCode::FORBIDDEN, "forbidden", "Forbidden".to_string())
            }
            AppError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation", msg.clone())
            }
            AppError::EvaluationFailure(msg) => {
                tracing::error!("Permission evaluation failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

// Conversion from validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::NotFound("Role not found".to_string());
        assert_eq!(err.to_string(), "Not found: Role not found");

        let err = AppError::DependencyInUse("Action PROJECT_DELETE".to_string());
        assert_eq!(err.to_string(), "Dependency in use: Action PROJECT_DELETE");
    }

    #[test]
    fn test_error_conversion() {
        let err: AppError = anyhow::anyhow!("Something went wrong").into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_forbidden_hides_detail() {
        let response =
            AppError::Forbidden("role lacks PROJECT_DELETE in plan free".to_string())
                .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Duplicate("x".into()), StatusCode::CONFLICT),
            (AppError::DependencyInUse("x".into()), StatusCode::CONFLICT),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Validation("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (
                AppError::EvaluationFailure("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_non_database_write_error_passes_through() {
        let err = AppError::from_write(sqlx::Error::RowNotFound, "Role", false);
        assert!(matches!(err, AppError::Database(_)));
    }
}
