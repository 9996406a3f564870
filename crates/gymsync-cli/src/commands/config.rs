use std::path::Path;

use gymsync_core::db::{LocalSettingsRepository, SettingsRepository};
use gymsync_core::{Credentials, EngineConfig};

use crate::cli::ConfigCommands;
use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_config(
    command: ConfigCommands,
    db_path: &Path,
    config: &EngineConfig,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Set { url, token } => run_config_set(url, token, db_path, config).await,
        ConfigCommands::Show => run_config_show(db_path, config).await,
        ConfigCommands::Clear => run_config_clear(db_path, config).await,
    }
}

#[allow(clippy::needless_pass_by_value)]
pub async fn run_config_set(
    url: Option<String>,
    token: Option<String>,
    db_path: &Path,
    config: &EngineConfig,
) -> Result<(), CliError> {
    let credentials = Credentials::resolve_from_env(url, token)?;
    let store = open_store(db_path, config).await?;
    LocalSettingsRepository::new(&store)
        .save_credentials(&credentials)
        .await?;

    println!("Saved remote credentials for {}", credentials.url);
    Ok(())
}

pub async fn run_config_show(db_path: &Path, config: &EngineConfig) -> Result<(), CliError> {
    let store = open_store(db_path, config).await?;
    let credentials = LocalSettingsRepository::new(&store).load_credentials().await?;

    for line in format_credentials_lines(credentials.as_ref()) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_config_clear(db_path: &Path, config: &EngineConfig) -> Result<(), CliError> {
    let store = open_store(db_path, config).await?;
    LocalSettingsRepository::new(&store)
        .clear_credentials()
        .await?;

    println!("Cleared remote credentials");
    Ok(())
}

pub fn format_credentials_lines(credentials: Option<&Credentials>) -> Vec<String> {
    match credentials {
        Some(credentials) => vec![
            format!("url:   {}", credentials.url),
            format!("token: {}", credentials.redacted_token()),
        ],
        None => vec!["Sync is not configured.".to_string()],
    }
}
