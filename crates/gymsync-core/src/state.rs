//! Shared sync state types.

use serde::Serialize;

/// Outcome of the most recent sync operation, as seen by callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Nothing has run yet in this process.
    #[default]
    Idle,
    Syncing,
    /// Last operation completed with every table synced.
    Synced,
    /// Last operation failed outright or left some tables unsynced.
    Error,
}
