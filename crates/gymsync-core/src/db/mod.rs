//! Database layer for gymsync

mod connection;
mod migrations;
mod remote;
mod settings_repository;
mod store;

pub use connection::LocalStore;
pub use migrations::DEFAULT_BOOTSTRAP_SCRIPT;
pub use remote::{ClientCache, RemoteClientCache, RemoteConnector, RemoteStore};
pub use settings_repository::{LocalSettingsRepository, SettingsRepository};
pub use store::{QueryResult, SqlStore};
