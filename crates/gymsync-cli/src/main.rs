//! gymsync CLI - Command-line front end for the replication engine
//!
//! Runs Pull, Push and Full Merge on demand, manages the stored remote
//! credentials, and can keep the local store in step on an interval.

mod cli;
mod commands;
mod error;

use clap::Parser;
use gymsync_core::{EngineConfig, SyncKind};

use crate::cli::{Cli, Commands, SchemaCommands};
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::notify::run_notify;
use crate::commands::sync::{run_schema_upgrade, run_sync};
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gymsync_core=info,gymsync=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env()?;
    let db_path = resolve_db_path(cli.db_path, &config)?;

    match cli.command {
        Commands::Pull { json } => run_sync(SyncKind::Pull, json, &db_path, &config).await?,
        Commands::Push { json } => run_sync(SyncKind::Push, json, &db_path, &config).await?,
        Commands::Merge { json } => {
            run_sync(SyncKind::FullMerge, json, &db_path, &config).await?;
        }
        Commands::Schema {
            command: SchemaCommands::Upgrade { json },
        } => run_schema_upgrade(json, &db_path, &config).await?,
        Commands::Config { command } => run_config(command, &db_path, &config).await?,
        Commands::Notify { table, id } => run_notify(&table, &id, &db_path, &config).await?,
        Commands::Watch { interval } => run_watch(interval, &db_path, &config).await?,
    }

    Ok(())
}
