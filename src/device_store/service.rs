//! DeviceStore Service
//!
//! Reconciles validated patches with persisted records. Each operation runs
//! in its own transaction and commits only on success; an early return drops
//! the transaction, which rolls it back. Mutations open their transaction
//! with `BEGIN IMMEDIATE`, so concurrent writers serialize (last writer wins).

use chrono::Utc;
use uuid::Uuid;

use super::repository::DeviceRepository;
use super::types::*;
use super::validation::{validate_device_payload, Mode};
use crate::error::{Error, Result};

/// DeviceStore service for business logic
pub struct DeviceService {
    repo: DeviceRepository,
}

impl DeviceService {
    /// Create new service
    pub fn new(repo: DeviceRepository) -> Self {
        Self { repo }
    }

    /// List all devices, oldest first
    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let mut tx = self.repo.begin().await?;
        let devices = self.repo.list_devices(&mut tx).await?;
        tx.commit().await?;
        Ok(devices)
    }

    /// Get device by ID
    pub async fn get_device(&self, id: &str) -> Result<Device> {
        let mut tx = self.repo.begin().await?;
        let device = self.repo.get_device(&mut tx, id).await?;
        tx.commit().await?;
        device.ok_or_else(|| not_found(id))
    }

    /// Create device from a create-mode patch
    pub async fn create_device(&self, patch: DevicePatch) -> Result<Device> {
        let device = Device::create(Uuid::new_v4().to_string(), Utc::now(), patch)?;

        let mut tx = self.repo.begin_write().await?;
        self.repo.insert_device(&mut tx, &device).await?;
        tx.commit().await?;

        tracing::info!(
            device_id = %device.id,
            device_type = %device.device_type,
            "Device created"
        );

        Ok(device)
    }

    /// Full replacement from a replace-mode patch.
    ///
    /// The patch already carries defaults for every omitted optional field,
    /// so applying it overwrites the whole writable set.
    pub async fn replace_device(&self, id: &str, patch: DevicePatch) -> Result<Device> {
        let mut tx = self.repo.begin_write().await?;
        let mut device = self
            .repo
            .get_device(&mut tx, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        device.apply(patch);
        device.updated_at = Utc::now();

        self.repo.update_device(&mut tx, &device).await?;
        tx.commit().await?;

        tracing::info!(device_id = %device.id, "Device replaced");

        Ok(device)
    }

    /// Partial update from a partial-mode patch.
    ///
    /// When the patch touches `type` or `endpoint`, the merged record is
    /// validated again as a full replacement; on failure nothing is written
    /// and that pass's errors are returned.
    pub async fn update_device(&self, id: &str, patch: DevicePatch) -> Result<Device> {
        let mut tx = self.repo.begin_write().await?;
        let mut device = self
            .repo
            .get_device(&mut tx, id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let recheck = patch.touches_type_or_endpoint();
        device.apply(patch);

        if recheck {
            let check = validate_device_payload(&device.writable_payload(), Mode::Replace);
            if !check.is_valid() {
                tracing::debug!(
                    device_id = %id,
                    errors = ?check.errors,
                    "Merged device failed re-validation, update discarded"
                );
                return Err(Error::Validation(check.errors));
            }
        }

        device.updated_at = Utc::now();

        self.repo.update_device(&mut tx, &device).await?;
        tx.commit().await?;

        tracing::info!(device_id = %device.id, "Device updated");

        Ok(device)
    }

    /// Delete device (hard delete, readings cascade)
    pub async fn delete_device(&self, id: &str) -> Result<()> {
        let mut tx = self.repo.begin_write().await?;
        if !self.repo.delete_device(&mut tx, id).await? {
            return Err(not_found(id));
        }
        tx.commit().await?;

        tracing::info!(device_id = %id, "Device deleted");

        Ok(())
    }
}

fn not_found(id: &str) -> Error {
    Error::NotFound(format!("Device {} not found", id))
}
