use std::path::Path;

use gymsync_core::{EngineConfig, SyncKind};
use serde_json::json;

use crate::commands::common::{format_report_lines, format_upgrade_lines, open_engine};
use crate::error::CliError;

pub async fn run_sync(
    kind: SyncKind,
    as_json: bool,
    db_path: &Path,
    config: &EngineConfig,
) -> Result<(), CliError> {
    let engine = open_engine(db_path, config).await?;
    let report = match kind {
        SyncKind::Pull => engine.pull().await?,
        SyncKind::Push => engine.push().await?,
        SyncKind::FullMerge => engine.full_merge().await?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    if report.is_complete() {
        Ok(())
    } else {
        Err(CliError::Incomplete(report.failures.len()))
    }
}

pub async fn run_schema_upgrade(
    as_json: bool,
    db_path: &Path,
    config: &EngineConfig,
) -> Result<(), CliError> {
    let engine = open_engine(db_path, config).await?;
    let (local, remote) = engine.upgrade_schemas().await?;

    if as_json {
        let value = json!({ "local": local, "remote": remote });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for line in format_upgrade_lines("local", &local)
        .into_iter()
        .chain(format_upgrade_lines("remote", &remote))
    {
        println!("{line}");
    }
    Ok(())
}
