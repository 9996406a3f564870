use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(gymsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `gymsync config set --url <URL> --token <TOKEN>`, or set TURSO_DATABASE_URL and TURSO_AUTH_TOKEN and run `gymsync config set`."
    )]
    SyncNotConfigured,
    #[error("{0} table(s) failed to sync")]
    Incomplete(usize),
}

impl From<gymsync_core::Error> for CliError {
    fn from(error: gymsync_core::Error) -> Self {
        match error {
            gymsync_core::Error::SyncNotConfigured => Self::SyncNotConfigured,
            other => Self::Core(other),
        }
    }
}
