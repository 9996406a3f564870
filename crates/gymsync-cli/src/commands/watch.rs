use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gymsync_core::sync::spawn_periodic_pull;
use gymsync_core::{EngineConfig, SyncState};

use crate::commands::common::open_engine;
use crate::error::CliError;

const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(300);

pub fn resolve_watch_interval(interval_secs: Option<u64>, config: &EngineConfig) -> Result<Duration, CliError> {
    match interval_secs {
        Some(0) => Err(CliError::Config("--interval must be at least 1 second".to_string())),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(config.pull_interval.unwrap_or(DEFAULT_WATCH_INTERVAL)),
    }
}

pub async fn run_watch(
    interval_secs: Option<u64>,
    db_path: &Path,
    config: &EngineConfig,
) -> Result<(), CliError> {
    let interval = resolve_watch_interval(interval_secs, config)?;
    let engine = Arc::new(open_engine(db_path, config).await?);
    engine.credentials().await?;

    let mut states = engine.subscribe();
    let puller = spawn_periodic_pull(Arc::clone(&engine), interval);
    println!("Pulling every {}s. Press Ctrl-C to stop.", interval.as_secs());

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                match *states.borrow_and_update() {
                    SyncState::Synced => println!("Pull synced"),
                    SyncState::Error => println!("Pull incomplete; see log for details"),
                    SyncState::Idle | SyncState::Syncing => {}
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    puller.abort();
    println!("Stopped");
    Ok(())
}
