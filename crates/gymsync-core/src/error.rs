//! Error types for gymsync-core

use thiserror::Error;

/// Result type alias using gymsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gymsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No remote url/token persisted in the settings store
    #[error("sync credentials not configured")]
    SyncNotConfigured,

    /// Remote client could not resolve a url/token pair
    #[error("missing credentials: remote url and auth token are required")]
    MissingCredentials,

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error should fail a whole sync operation rather than be
    /// absorbed into a partial report.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::SyncNotConfigured | Self::MissingCredentials | Self::Config(_)
        )
    }

    /// Whether the engine reported that a column being added already exists.
    pub fn is_duplicate_column(&self) -> bool {
        self.to_string()
            .to_ascii_lowercase()
            .contains("duplicate column")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_not_configured_message_is_stable() {
        assert_eq!(
            Error::SyncNotConfigured.to_string(),
            "sync credentials not configured"
        );
    }

    #[test]
    fn configuration_errors_are_distinguished() {
        assert!(Error::SyncNotConfigured.is_configuration());
        assert!(Error::MissingCredentials.is_configuration());
        assert!(!Error::Database("timeout".to_string()).is_configuration());
    }

    #[test]
    fn detects_duplicate_column_messages() {
        assert!(Error::Database("duplicate column name: deleted_at".to_string())
            .is_duplicate_column());
        assert!(!Error::InvalidInput("row has no id".to_string()).is_duplicate_column());
    }
}
