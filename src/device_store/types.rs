//! DeviceStore data types
//!
//! Device records, the typed patch produced by validation, and the
//! externally visible representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use std::fmt;

use crate::error::{Error, Result};

/// Default poll interval (seconds)
pub const DEFAULT_POLL_INTERVAL_S: i64 = 60;
/// Accepted poll interval range (seconds)
pub const POLL_INTERVAL_RANGE: (i64, i64) = (1, 3600);
/// Default request timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;
/// Accepted request timeout range (milliseconds)
pub const TIMEOUT_RANGE: (i64, i64) = (100, 60000);

/// Device type (closed set)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Still image fetched over HTTP(S)
    CameraIpSnapshot,
    /// RTSP stream
    CameraRtsp,
}

impl DeviceType {
    pub const ALL: [DeviceType; 2] = [DeviceType::CameraIpSnapshot, DeviceType::CameraRtsp];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::CameraIpSnapshot => "camera_ip_snapshot",
            DeviceType::CameraRtsp => "camera_rtsp",
        }
    }

    /// Exact (case-sensitive) lookup by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// URL schemes an endpoint of this type may use
    pub fn allowed_schemes(&self) -> &'static [&'static str] {
        match self {
            DeviceType::CameraIpSnapshot => &["http", "https"],
            DeviceType::CameraRtsp => &["rtsp"],
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Endpoint authentication mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    None,
    Basic,
    Digest,
    Bearer,
}

impl AuthMode {
    pub const ALL: [AuthMode; 4] = [
        AuthMode::None,
        AuthMode::Basic,
        AuthMode::Digest,
        AuthMode::Bearer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Basic => "basic",
            AuthMode::Digest => "digest",
            AuthMode::Bearer => "bearer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device entity as persisted.
///
/// Deliberately not `Serialize`: the only outward representation is
/// [`DeviceResponse`], which never carries `auth_password`.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub device_type: DeviceType,
    pub enabled: bool,
    pub endpoint: String,
    pub auth_mode: Option<AuthMode>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub poll_interval_s: i64,
    pub timeout_ms: i64,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // === Operational fields (written by the poller only) ===
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Device {
    /// Build a new record from a create-mode patch.
    ///
    /// `created_at` and `updated_at` both take `now`.
    pub fn create(id: String, now: DateTime<Utc>, patch: DevicePatch) -> Result<Self> {
        let mut missing = Vec::new();
        if patch.name.is_none() {
            missing.push("missing required field: name".to_string());
        }
        if patch.device_type.is_none() {
            missing.push("missing required field: type".to_string());
        }
        if patch.endpoint.is_none() {
            missing.push("missing required field: endpoint".to_string());
        }

        let (Some(name), Some(device_type), Some(endpoint)) =
            (patch.name, patch.device_type, patch.endpoint)
        else {
            return Err(Error::Validation(missing));
        };

        Ok(Self {
            id,
            name,
            device_type,
            enabled: patch.enabled.unwrap_or(true),
            endpoint,
            auth_mode: patch.auth_mode.unwrap_or(Some(AuthMode::None)),
            auth_username: patch.auth_username.flatten(),
            auth_password: patch.auth_password.flatten(),
            poll_interval_s: patch.poll_interval_s.unwrap_or(DEFAULT_POLL_INTERVAL_S),
            timeout_ms: patch.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            tags: patch.tags.unwrap_or_default(),
            notes: patch.notes.flatten(),
            created_at: now,
            updated_at: now,
            last_seen_at: None,
            last_poll_at: None,
            last_error: None,
        })
    }

    /// Overwrite exactly the fields present in `patch`.
    pub fn apply(&mut self, patch: DevicePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(device_type) = patch.device_type {
            self.device_type = device_type;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(endpoint) = patch.endpoint {
            self.endpoint = endpoint;
        }
        if let Some(auth_mode) = patch.auth_mode {
            self.auth_mode = auth_mode;
        }
        if let Some(auth_username) = patch.auth_username {
            self.auth_username = auth_username;
        }
        if let Some(auth_password) = patch.auth_password {
            self.auth_password = auth_password;
        }
        if let Some(poll_interval_s) = patch.poll_interval_s {
            self.poll_interval_s = poll_interval_s;
        }
        if let Some(timeout_ms) = patch.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }

    /// True iff a non-empty password is stored
    pub fn has_auth_password(&self) -> bool {
        self.auth_password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// All client-writable fields as a full-replacement payload
    pub fn writable_payload(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "type": self.device_type,
            "enabled": self.enabled,
            "endpoint": self.endpoint,
            "auth_mode": self.auth_mode,
            "auth_username": self.auth_username,
            "auth_password": self.auth_password,
            "poll_interval_s": self.poll_interval_s,
            "timeout_ms": self.timeout_ms,
            "tags": self.tags,
            "notes": self.notes,
        })
    }
}

/// Row shape of the `devices` table
#[derive(Debug, Clone, FromRow)]
pub(crate) struct DeviceRow {
    pub id: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub device_type: String,
    pub enabled: bool,
    pub endpoint: String,
    pub auth_mode: Option<String>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub poll_interval_s: i64,
    pub timeout_ms: i64,
    /// JSON array text
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = Error;

    fn try_from(row: DeviceRow) -> Result<Self> {
        let device_type = DeviceType::from_name(&row.device_type).ok_or_else(|| {
            Error::Database(format!(
                "device {} has unknown type {:?}",
                row.id, row.device_type
            ))
        })?;

        let auth_mode = match row.auth_mode.as_deref() {
            None => None,
            Some(raw) => Some(AuthMode::from_name(raw).ok_or_else(|| {
                Error::Database(format!("device {} has unknown auth_mode {:?}", row.id, raw))
            })?),
        };

        let tags = match row.tags.as_deref() {
            None => Vec::new(),
            Some(raw) => serde_json::from_str::<Option<Vec<String>>>(raw)?.unwrap_or_default(),
        };

        Ok(Self {
            id: row.id,
            name: row.name,
            device_type,
            enabled: row.enabled,
            endpoint: row.endpoint,
            auth_mode,
            auth_username: row.auth_username,
            auth_password: row.auth_password,
            poll_interval_s: row.poll_interval_s,
            timeout_ms: row.timeout_ms,
            tags,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_seen_at: row.last_seen_at,
            last_poll_at: row.last_poll_at,
            last_error: row.last_error,
        })
    }
}

/// Normalized, type-checked subset of a payload.
///
/// `None` means "field not supplied". For nullable columns the inner
/// `Option` carries the explicit null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePatch {
    pub name: Option<String>,
    pub device_type: Option<DeviceType>,
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub auth_mode: Option<Option<AuthMode>>,
    pub auth_username: Option<Option<String>>,
    pub auth_password: Option<Option<String>>,
    pub poll_interval_s: Option<i64>,
    pub timeout_ms: Option<i64>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<Option<String>>,
}

impl DevicePatch {
    /// Seed for create / replace: every optional field at its default
    pub fn with_defaults() -> Self {
        Self {
            enabled: Some(true),
            auth_mode: Some(Some(AuthMode::None)),
            auth_username: Some(None),
            auth_password: Some(None),
            poll_interval_s: Some(DEFAULT_POLL_INTERVAL_S),
            timeout_ms: Some(DEFAULT_TIMEOUT_MS),
            tags: Some(Vec::new()),
            notes: Some(None),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether applying this patch can break the endpoint/type coupling
    pub fn touches_type_or_endpoint(&self) -> bool {
        self.device_type.is_some() || self.endpoint.is_some()
    }
}

/// Serialized device representation (password redacted)
#[derive(Debug, Clone, Serialize)]
pub struct DeviceResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub enabled: bool,
    pub endpoint: String,
    pub auth_mode: Option<AuthMode>,
    pub auth_username: Option<String>,
    pub has_auth_password: bool,
    pub poll_interval_s: i64,
    pub timeout_ms: i64,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<Device> for DeviceResponse {
    fn from(device: Device) -> Self {
        let has_auth_password = device.has_auth_password();
        Self {
            id: device.id,
            name: device.name,
            device_type: device.device_type,
            enabled: device.enabled,
            endpoint: device.endpoint,
            auth_mode: device.auth_mode,
            auth_username: device.auth_username,
            has_auth_password,
            poll_interval_s: device.poll_interval_s,
            timeout_ms: device.timeout_ms,
            tags: device.tags,
            notes: device.notes,
            created_at: device.created_at,
            updated_at: device.updated_at,
            last_seen_at: device.last_seen_at,
            last_poll_at: device.last_poll_at,
            last_error: device.last_error,
        }
    }
}
