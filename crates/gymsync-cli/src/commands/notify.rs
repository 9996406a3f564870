use std::path::Path;
use std::sync::Arc;

use gymsync_core::sync::WriteThroughStats;
use gymsync_core::{CatalogTable, EngineConfig, RemoteClientCache, WriteThroughHook};

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_notify(
    table: &str,
    id: &str,
    db_path: &Path,
    config: &EngineConfig,
) -> Result<(), CliError> {
    let table: CatalogTable = table.parse()?;
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::Config("row id cannot be empty".to_string()));
    }

    let store = open_store(db_path, config).await?;
    let (hook, worker) = WriteThroughHook::spawn(
        &config.write_through,
        store,
        Arc::new(RemoteClientCache::new()),
    );
    hook.notify_changed(table, id);
    drop(hook);

    let stats = worker.join().await;
    println!("{}", format_notify_line(table, id, stats));

    if stats.failed > 0 {
        return Err(CliError::Incomplete(1));
    }
    Ok(())
}

pub fn format_notify_line(table: CatalogTable, id: &str, stats: WriteThroughStats) -> String {
    if stats.propagated > 0 {
        format!("Propagated {table} {id}")
    } else if stats.failed > 0 {
        format!("Failed to propagate {table} {id}")
    } else {
        format!("Skipped {table} {id} (row missing or sync not configured)")
    }
}
