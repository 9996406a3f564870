use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gymsync")]
#[command(about = "Replicate the gym catalog between the local store and the hosted database")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy every live remote row into the local store
    Pull {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Copy every live local row into the remote store
    Push {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile both stores; remote wins on id collisions
    #[command(alias = "full-merge")]
    Merge {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or upgrade table schemas
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Manage the remote credentials stored in the local database
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Propagate one changed row to the remote store
    Notify {
        /// Catalog table name (plans, members, payments, attendance, equipment)
        table: String,
        /// Row id
        id: String,
    },
    /// Pull on an interval until interrupted
    Watch {
        /// Seconds between pulls (falls back to GYMSYNC_PULL_INTERVAL_SECS)
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Add missing sync columns to both stores
    Upgrade {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Save remote credentials (missing values fall back to the environment)
    Set {
        /// Remote database URL
        #[arg(long)]
        url: Option<String>,
        /// Remote auth token
        #[arg(long)]
        token: Option<String>,
    },
    /// Show the stored remote URL and a redacted token
    Show,
    /// Forget the stored remote credentials
    Clear,
}
