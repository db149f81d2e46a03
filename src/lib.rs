//! Himalia API - device registry
//!
//! Stores configuration records for polled camera devices and exposes CRUD
//! over them.
//!
//! ## Components
//!
//! 1. DeviceStore - payload validation and record reconciliation
//! 2. Database - SQLite storage handle and migrations
//! 3. WebAPI - REST endpoints, API key check, health

pub mod db;
pub mod device_store;
pub mod error;
pub mod models;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
