//! Shared-secret API key check.
//!
//! Paths under `/api/v1/` require `X-API-Key` to equal the configured key.
//! Health and the OpenAPI document are always reachable. With an empty key
//! the service runs in open mode and nothing is checked.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::Error;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

const PROTECTED_PREFIX: &str = "/api/v1/";

/// Reachable without a key
const PUBLIC_PATHS: [&str; 2] = ["/api/v1/health", "/api/v1/openapi.json"];

fn is_protected(path: &str) -> bool {
    path.starts_with(PROTECTED_PREFIX) && !PUBLIC_PATHS.contains(&path)
}

pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Error> {
    if !state.config.auth_enabled() || !is_protected(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != state.config.api_key {
        return Err(Error::Unauthorized);
    }

    Ok(next.run(req).await)
}
