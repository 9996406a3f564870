use std::path::{Path, PathBuf};
use std::sync::Arc;

use gymsync_core::sync::SchemaUpgrade;
use gymsync_core::{EngineConfig, LocalStore, RemoteClientCache, SyncEngine, SyncReport};

use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &EngineConfig) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| config.db_path.clone()) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("gymsync").join("data.db"))
        .ok_or_else(|| CliError::Config("failed to resolve CLI data directory".to_string()))
}

pub async fn open_store(path: &Path, config: &EngineConfig) -> Result<Arc<LocalStore>, CliError> {
    let script = config.bootstrap_script()?;
    let store = LocalStore::open(path, &script).await?;
    if let Some(backup) = store.recovered_from() {
        eprintln!(
            "Warning: local database was unreadable and has been reset. Backup: {}",
            backup.display()
        );
    }
    Ok(Arc::new(store))
}

pub async fn open_engine(path: &Path, config: &EngineConfig) -> Result<SyncEngine, CliError> {
    let store = open_store(path, config).await?;
    Ok(SyncEngine::new(store, Arc::new(RemoteClientCache::new())))
}

pub fn format_report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} finished: {} rows",
        capitalize(&report.kind.to_string()),
        report.total()
    )];

    for (table, count) in &report.counts {
        match report.failures.get(table) {
            Some(reason) => lines.push(format!("  {table:<10} failed ({reason})")),
            None => lines.push(format!("  {table:<10} {count}")),
        }
    }
    lines
}

pub fn format_upgrade_lines(store: &str, upgrade: &SchemaUpgrade) -> Vec<String> {
    let mut lines = Vec::new();
    if upgrade.added.is_empty() && upgrade.is_clean() {
        lines.push(format!("{store}: schema up to date"));
        return lines;
    }

    for (table, column) in &upgrade.added {
        lines.push(format!("{store}: added {table}.{column}"));
    }
    for failure in &upgrade.failures {
        lines.push(format!("{store}: failed {failure}"));
    }
    lines
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
