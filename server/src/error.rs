//! Unified error handling for the server.
//!
//! Every error leaves the server as `{"error": <code>, "message": <text>}`.
//! Validation failures are application errors and travel in a 200 response;
//! clients recognize them by the truthy `error` field.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Code carried by validation failures.
pub const VALIDATION_ERROR_CODE: u16 = 422;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: u16,
    pub message: String,
}

impl AppError {
    /// HTTP status and body code for this error.
    fn status_and_code(&self) -> (StatusCode, u16) {
        match self {
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, 500),
            AppError::Validation(_) => (StatusCode::OK, VALIDATION_ERROR_CODE),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, 404),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, 401),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(ErrorResponse {
                error: code,
                message,
            }),
        )
            .into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
