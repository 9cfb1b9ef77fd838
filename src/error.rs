//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::repository::RepoError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} already exists")]
    DuplicateKey(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated. Contact admin.")]
    AccountDisabled,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    // Server errors (5xx)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// HTTP status and stable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            // 400 Bad Request
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::DuplicateKey(_) => (StatusCode::BAD_REQUEST, "duplicate_key"),
            AppError::InvalidCredentials => (StatusCode::BAD_REQUEST, "invalid_credentials"),

            // 401 Unauthorized
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),

            // 403 Forbidden
            AppError::AccountDisabled => (StatusCode::FORBIDDEN, "account_disabled"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),

            // 404 Not Found
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),

            // 500 Internal Server Error
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { field } => AppError::DuplicateKey(field.to_string()),
            RepoError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Unexpected failures keep the underlying message for diagnostics
        let details = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                Some(e.to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Some(msg.clone())
            }
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
