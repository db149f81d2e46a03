//! DeviceStore - device configuration records
//!
//! ## Responsibilities
//!
//! - Payload validation and normalization (create / replace / partial)
//! - Endpoint scheme vs. device type consistency
//! - Persisting records under the three update semantics
//!
//! Polling, image capture and readings aggregation live elsewhere; this
//! module only declares the readings table and relies on its cascade.

mod repository;
mod service;
mod types;
pub mod validation;

pub use repository::DeviceRepository;
pub use service::DeviceService;
pub use types::*;
pub use validation::{validate_device_payload, Mode, ValidationResult};

use sqlx::SqlitePool;

/// DeviceStore instance: validator in front of the service
pub struct DeviceStore {
    service: DeviceService,
}

impl DeviceStore {
    /// Create new DeviceStore
    pub fn new(pool: SqlitePool) -> Self {
        let repo = DeviceRepository::new(pool);
        Self {
            service: DeviceService::new(repo),
        }
    }

    /// Get service reference
    pub fn service(&self) -> &DeviceService {
        &self.service
    }

    /// Validate a POST body and create the device
    pub async fn create(&self, payload: &serde_json::Value) -> crate::Result<Device> {
        let patch = validate(payload, Mode::Create)?;
        self.service.create_device(patch).await
    }

    /// Validate a PUT body and replace the device
    pub async fn replace(&self, id: &str, payload: &serde_json::Value) -> crate::Result<Device> {
        let patch = validate(payload, Mode::Replace)?;
        self.service.replace_device(id, patch).await
    }

    /// Validate a PATCH body and update the device
    pub async fn update(&self, id: &str, payload: &serde_json::Value) -> crate::Result<Device> {
        let patch = validate(payload, Mode::Partial)?;
        self.service.update_device(id, patch).await
    }
}

fn validate(payload: &serde_json::Value, mode: Mode) -> crate::Result<DevicePatch> {
    let result = validate_device_payload(payload, mode);
    if !result.is_valid() {
        tracing::debug!(?mode, errors = ?result.errors, "Device payload rejected");
    }
    result.into_patch()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_updates_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("himalia.sqlite3").display());
        let db = Database::connect(&url).await.unwrap();
        db.migrate().await.unwrap();

        let store = Arc::new(DeviceStore::new(db.pool().clone()));
        let mut ids = Vec::new();
        for i in 0..5 {
            let device = store
                .create(&json!({
                    "name": format!("Cam {i}"),
                    "type": "camera_rtsp",
                    "endpoint": "rtsp://host/stream",
                }))
                .await
                .unwrap();
            ids.push(device.id);
        }

        let mut handles = Vec::new();
        for n in 0..50i64 {
            let store = store.clone();
            let id = ids[n as usize % ids.len()].clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(&id, &json!({"poll_interval_s": n + 1}))
                    .await
                    .map_err(|e| e.to_string())
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            if let Err(e) = handle.await.unwrap() {
                failures.push(e);
            }
        }
        assert!(failures.is_empty(), "failed {} of 50: {failures:?}", failures.len());

        // Every device ended up with one of the values written to it.
        for (i, id) in ids.iter().enumerate() {
            let device = store.service().get_device(id).await.unwrap();
            assert_eq!((device.poll_interval_s - 1) as usize % ids.len(), i);
        }

        db.close().await;
    }

    #[tokio::test]
    async fn test_partial_type_change_is_rechecked_against_stored_endpoint() {
        let db = Database::open_in_memory().await.unwrap();
        let store = DeviceStore::new(db.pool().clone());
        let created = store
            .create(&json!({
                "name": "Gate",
                "type": "camera_rtsp",
                "endpoint": "rtsp://host/stream",
            }))
            .await
            .unwrap();

        let err = store
            .update(&created.id, &json!({"type": "camera_ip_snapshot"}))
            .await
            .unwrap_err();
        match err {
            crate::Error::Validation(details) => assert_eq!(
                details,
                vec!["endpoint scheme must be http or https for camera_ip_snapshot"]
            ),
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = store.service().get_device(&created.id).await.unwrap();
        assert_eq!(stored, created);
    }
}
