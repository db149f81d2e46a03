//! Application state
//!
//! Holds configuration and the shared handles every request reads

use crate::db::Database;
use crate::device_store::DeviceStore;
use std::sync::Arc;

/// Placeholder key used when `HIMALIA_API_KEY` is unset
pub const DEFAULT_API_KEY: &str = "change-me";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shared secret expected in `X-API-Key`; empty disables auth
    pub api_key: String,
    /// Database URL
    pub database_url: String,
    /// Serve the OpenAPI document
    pub openapi_enabled: bool,
    /// Apply schema migrations at startup
    pub migrations_on_startup: bool,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
}

impl AppConfig {
    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());

        Self {
            api_key: var("HIMALIA_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.to_string()),
            database_url: var("HIMALIA_DB_URL")
                .unwrap_or_else(|| "sqlite:///data/db/himalia.sqlite3".to_string()),
            openapi_enabled: var("HIMALIA_OPENAPI_ENABLED")
                .map(|v| is_truthy(&v))
                .unwrap_or(true),
            migrations_on_startup: var("HIMALIA_MIGRATIONS_ON_STARTUP")
                .map(|v| is_truthy(&v))
                .unwrap_or(true),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
        }
    }

    /// Whether protected paths require the API key
    pub fn auth_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Only `0`, `false` and `no` switch a flag off
fn is_truthy(value: &str) -> bool {
    !matches!(value.to_lowercase().as_str(), "0" | "false" | "no")
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage handle
    pub db: Database,
    /// Application config
    pub config: Arc<AppConfig>,
    /// DeviceStore (validator + reconciler)
    pub device_store: Arc<DeviceStore>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let device_store = Arc::new(DeviceStore::new(db.pool().clone()));
        Self {
            db,
            config: Arc::new(config),
            device_store,
        }
    }
}
