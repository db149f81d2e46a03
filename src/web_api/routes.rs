//! API Routes

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{Map, Value};

use super::auth::require_api_key;
use crate::device_store::DeviceResponse;
use crate::models::ListResponse;
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health
        .route("/api/v1/health", get(super::health_check))
        // Devices
        .route("/api/v1/devices", get(list_devices))
        .route("/api/v1/devices", post(create_device))
        .route("/api/v1/devices/:id", get(get_device))
        .route("/api/v1/devices/:id", put(replace_device))
        .route("/api/v1/devices/:id", patch(update_device))
        .route("/api/v1/devices/:id", delete(delete_device));

    if state.config.openapi_enabled {
        router = router.route("/api/v1/openapi.json", get(super::openapi_document));
    }

    router
        .fallback(super::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Raw body as JSON.
///
/// A missing or unparseable body, and any falsy JSON value (`null`, `false`,
/// `0`, `""`, `[]`), reads as an empty object.
fn parse_body(body: &Bytes) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) if !is_falsy(&value) => value,
        _ => Value::Object(Map::new()),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

// ========================================
// Device Handlers
// ========================================

async fn list_devices(State(state): State<AppState>) -> Result<impl IntoResponse, crate::Error> {
    let devices = state.device_store.service().list_devices().await?;
    let items: Vec<DeviceResponse> = devices.into_iter().map(DeviceResponse::from).collect();
    Ok(Json(ListResponse::new(items)))
}

async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, crate::Error> {
    let device = state.device_store.service().get_device(&id).await?;
    Ok(Json(DeviceResponse::from(device)))
}

async fn create_device(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, crate::Error> {
    let device = state.device_store.create(&parse_body(&body)).await?;
    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}

/// Full replacement: omitted optional fields reset to defaults
async fn replace_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, crate::Error> {
    let device = state.device_store.replace(&id, &parse_body(&body)).await?;
    Ok(Json(DeviceResponse::from(device)))
}

/// Partial update: omitted fields stay as they are
async fn update_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, crate::Error> {
    let device = state.device_store.update(&id, &parse_body(&body)).await?;
    Ok(Json(DeviceResponse::from(device)))
}

async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, crate::Error> {
    state.device_store.service().delete_device(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
