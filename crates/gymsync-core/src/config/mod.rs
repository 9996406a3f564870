//! Engine configuration.
//!
//! Values come from the process environment (`from_env`) or any lookup
//! closure (`from_lookup`, used by tests). Blank values count as absent.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::db::DEFAULT_BOOTSTRAP_SCRIPT;
use crate::error::{Error, Result};
use crate::util::{normalize_text_option, parse_flag};

pub const DB_PATH_ENV: &str = "GYMSYNC_DB_PATH";
pub const BOOTSTRAP_SCHEMA_ENV: &str = "GYMSYNC_BOOTSTRAP_SCHEMA";
pub const WRITE_THROUGH_ENV: &str = "GYMSYNC_WRITE_THROUGH";
pub const WRITE_THROUGH_QUEUE_ENV: &str = "GYMSYNC_WRITE_THROUGH_QUEUE";
pub const WRITE_THROUGH_RETRIES_ENV: &str = "GYMSYNC_WRITE_THROUGH_RETRIES";
pub const PULL_INTERVAL_ENV: &str = "GYMSYNC_PULL_INTERVAL_SECS";

const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Settings for the per-write propagation path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteThroughConfig {
    /// Off by default: the system stays strictly offline-first unless enabled.
    pub enabled: bool,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for WriteThroughConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Deployment configuration for the replication engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Local store file; callers pick a platform default when unset.
    pub db_path: Option<PathBuf>,
    /// SQL script run once against a brand-new local store.
    pub bootstrap_schema_path: Option<PathBuf>,
    pub write_through: WriteThroughConfig,
    /// Background pull interval; `None` keeps the periodic puller off.
    pub pull_interval: Option<Duration>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |name: &str| normalize_text_option(lookup(name));

        let write_through = WriteThroughConfig {
            enabled: value(WRITE_THROUGH_ENV).is_some_and(|flag| parse_flag(&flag)),
            queue_capacity: parse_positive(value(WRITE_THROUGH_QUEUE_ENV), WRITE_THROUGH_QUEUE_ENV)?
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
            max_attempts: parse_positive(value(WRITE_THROUGH_RETRIES_ENV), WRITE_THROUGH_RETRIES_ENV)?
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        };

        let pull_interval = parse_positive::<u64>(value(PULL_INTERVAL_ENV), PULL_INTERVAL_ENV)?
            .map(Duration::from_secs);

        Ok(Self {
            db_path: value(DB_PATH_ENV).map(PathBuf::from),
            bootstrap_schema_path: value(BOOTSTRAP_SCHEMA_ENV).map(PathBuf::from),
            write_through,
            pull_interval,
        })
    }

    /// The bootstrap script: the configured file, or the built-in catalog schema.
    pub fn bootstrap_script(&self) -> Result<Cow<'static, str>> {
        let Some(path) = &self.bootstrap_schema_path else {
            return Ok(Cow::Borrowed(DEFAULT_BOOTSTRAP_SCRIPT));
        };
        std::fs::read_to_string(path).map(Cow::Owned).map_err(|error| {
            Error::Config(format!(
                "failed to read bootstrap schema {}: {error}",
                path.display()
            ))
        })
    }
}

fn parse_positive<T>(raw: Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<T>() {
        Ok(value) if value != T::default() => Ok(Some(value)),
        _ => Err(Error::Config(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}
