//! limber-core - Core library for Limber
//!
//! Domain models for the rehabilitation log, the on-device record store, the
//! account-scoped remote service and the engine that keeps the two in sync.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;
pub mod util;

pub use config::{AppConfig, SyncConfig};
pub use db::{LocalStore, SqliteStore};
pub use error::{Error, Result};
pub use models::{NewRecord, StableId, SyncEntity, SyncRecord};
pub use remote::{MemoryRemote, RemoteService, SupabaseRemote};
pub use sync::{Registry, SyncEngine, SyncReport};
