//! DeviceStore Repository
//!
//! Database access layer for device records. Every method takes the
//! connection of the caller's unit of work, so a service operation can run
//! its read and its write inside one transaction.

use super::types::*;
use crate::error::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

/// Device repository for database operations
#[derive(Clone)]
pub struct DeviceRepository {
    pool: SqlitePool,
}

impl DeviceRepository {
    /// Device SELECT columns
    const DEVICE_COLUMNS: &'static str = r#"
        id, name, type, enabled, endpoint,
        auth_mode, auth_username, auth_password,
        poll_interval_s, timeout_ms, tags, notes,
        created_at, updated_at,
        last_seen_at, last_poll_at, last_error
    "#;

    /// Create new repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a read-only unit of work
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Open a unit of work that will write.
    ///
    /// Takes the write lock up front so a concurrent writer waits on the busy
    /// timeout instead of failing the read-to-write upgrade with SQLITE_BUSY.
    pub async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Get device by ID
    pub async fn get_device(&self, conn: &mut SqliteConnection, id: &str) -> Result<Option<Device>> {
        let query = format!("SELECT {} FROM devices WHERE id = ?", Self::DEVICE_COLUMNS);
        let row = sqlx::query_as::<_, DeviceRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        row.map(Device::try_from).transpose()
    }

    /// All devices, oldest first
    pub async fn list_devices(&self, conn: &mut SqliteConnection) -> Result<Vec<Device>> {
        let query = format!(
            "SELECT {} FROM devices ORDER BY created_at ASC, rowid ASC",
            Self::DEVICE_COLUMNS
        );
        let rows = sqlx::query_as::<_, DeviceRow>(&query)
            .fetch_all(conn)
            .await?;

        rows.into_iter().map(Device::try_from).collect()
    }

    /// Insert a new device row
    pub async fn insert_device(&self, conn: &mut SqliteConnection, device: &Device) -> Result<()> {
        let tags = serde_json::to_string(&device.tags)?;

        sqlx::query(
            r#"
            INSERT INTO devices (
                id, name, type, enabled, endpoint,
                auth_mode, auth_username, auth_password,
                poll_interval_s, timeout_ms, tags, notes,
                created_at, updated_at,
                last_seen_at, last_poll_at, last_error
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&device.id)
        .bind(&device.name)
        .bind(device.device_type.as_str())
        .bind(device.enabled)
        .bind(&device.endpoint)
        .bind(device.auth_mode.map(|m| m.as_str()))
        .bind(&device.auth_username)
        .bind(&device.auth_password)
        .bind(device.poll_interval_s)
        .bind(device.timeout_ms)
        .bind(tags)
        .bind(&device.notes)
        .bind(device.created_at)
        .bind(device.updated_at)
        .bind(device.last_seen_at)
        .bind(device.last_poll_at)
        .bind(&device.last_error)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Write every client-writable column plus `updated_at`.
    ///
    /// `id`, `created_at` and the operational columns are never touched.
    pub async fn update_device(&self, conn: &mut SqliteConnection, device: &Device) -> Result<bool> {
        let tags = serde_json::to_string(&device.tags)?;

        let result = sqlx::query(
            r#"
            UPDATE devices SET
                name = ?, type = ?, enabled = ?, endpoint = ?,
                auth_mode = ?, auth_username = ?, auth_password = ?,
                poll_interval_s = ?, timeout_ms = ?, tags = ?, notes = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&device.name)
        .bind(device.device_type.as_str())
        .bind(device.enabled)
        .bind(&device.endpoint)
        .bind(device.auth_mode.map(|m| m.as_str()))
        .bind(&device.auth_username)
        .bind(&device.auth_password)
        .bind(device.poll_interval_s)
        .bind(device.timeout_ms)
        .bind(tags)
        .bind(&device.notes)
        .bind(device.updated_at)
        .bind(&device.id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete device (readings cascade). Returns false if no such device.
    pub async fn delete_device(&self, conn: &mut SqliteConnection, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
