//! Error handling for the Himalia device registry

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more field / cross-field rule violations, in report order
    #[error("Validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Missing or incorrect API key
    #[error("Unauthorized")]
    Unauthorized,

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLx database error
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Error::Validation(details) => {
                tracing::warn!(
                    status = %status,
                    error_count = details.len(),
                    "Request rejected: validation error"
                );
                json!({
                    "error": "validation_error",
                    "details": details,
                })
            }
            Error::NotFound(what) => {
                tracing::debug!(status = %status, what = %what, "Request rejected: not found");
                json!({ "error": "not_found" })
            }
            Error::Unauthorized => {
                tracing::warn!(status = %status, "Request rejected: unauthorized");
                json!({ "error": "unauthorized" })
            }
            other => {
                // Backend details stay in the log, never in the response body.
                tracing::error!(status = %status, error = %other, "Request error");
                json!({ "error": "internal_error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
