//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes under `/api/v1`
//! - API key check
//! - Response formatting

pub mod auth;
mod openapi;
mod routes;

pub use openapi::build_openapi;
pub use routes::create_router;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint (503 when the database does not answer)
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.db.ping().await;

    let response = HealthResponse {
        status: "ok".to_string(),
        db: if db_ok { "ok" } else { "error" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// OpenAPI document endpoint
pub async fn openapi_document() -> impl IntoResponse {
    Json(build_openapi())
}

/// JSON 404 for unmatched routes
pub async fn not_found(uri: Uri) -> crate::Error {
    crate::Error::NotFound(format!("route {}", uri.path()))
}
