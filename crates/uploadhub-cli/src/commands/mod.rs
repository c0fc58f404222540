//! CLI command definitions and dispatch.

pub mod config;
pub mod migrate;
pub mod session;
pub mod sweep;

use clap::{Parser, Subcommand};

use uploadhub_core::config::AppConfig;
use uploadhub_core::config::database::StoreProvider;
use uploadhub_core::error::AppError;

use crate::output::OutputFormat;

/// UploadHub: resumable chunked media uploads
#[derive(Debug, Parser)]
#[command(name = "uploadhub", version, about, long_about = None)]
pub struct Cli {
    /// Configuration overlay (`config/{env}.toml`)
    #[arg(short, long, env = "UPLOADHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Run one expiry sweep and exit
    Sweep(sweep::SweepArgs),
    /// Inspect upload sessions
    Session(session::SessionArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => migrate::execute(&self.env).await,
            Commands::Sweep(args) => sweep::execute(args, &self.env, self.format).await,
            Commands::Session(args) => session::execute(args, &self.env, self.format).await,
            Commands::Config(args) => config::execute(args, &self.env, self.format).await,
        }
    }
}

/// Helper: load configuration for an environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env)
}

/// Session commands must run against the store the server writes to. An
/// in-memory store opened by this process is empty, so every live chunk
/// directory would look orphaned to it.
pub fn require_shared_store(config: &AppConfig) -> Result<(), AppError> {
    if config.database.provider == StoreProvider::Memory {
        return Err(AppError::configuration(
            "This command needs database.provider = \"postgres\"; the in-memory store only lives inside the server process",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_session_show() {
        let cli = Cli::try_parse_from([
            "uploadhub",
            "--format",
            "json",
            "session",
            "show",
            "0192f0c2-7a51-7d2e-9a7b-8c3e2f6d1a40",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Session(_)));
    }

    #[test]
    fn test_session_commands_refuse_process_local_store() {
        let mut config = AppConfig::default();
        config.database.provider = StoreProvider::Memory;
        let err = require_shared_store(&config).unwrap_err();
        assert_eq!(err.kind, uploadhub_core::error::ErrorKind::Configuration);

        config.database.provider = StoreProvider::Postgres;
        assert!(require_shared_store(&config).is_ok());
    }
}
