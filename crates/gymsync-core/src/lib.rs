//! gymsync-core - Local-first replication engine
//!
//! This crate contains the local store, the cached remote client, and the
//! Pull, Push and Full Merge operations that keep the gym catalog tables in
//! step between them. The CLI and any embedding application sit on top.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;
pub mod sync;
mod util;

pub use config::{EngineConfig, WriteThroughConfig};
pub use db::{LocalStore, RemoteClientCache, RemoteStore, SqlStore};
pub use error::{Error, Result};
pub use models::{CatalogTable, Credentials, Row, SqlValue, SyncKind, SyncReport};
pub use state::SyncState;
pub use sync::{SyncEngine, WriteThroughHook};
