//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod blob;
pub mod database;
pub mod logging;
pub mod uploads;
pub mod worker;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::blob::BlobConfig;
use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::uploads::UploadsConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Upper bound on the session TTL (one year).
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Chunked upload limits and quotas.
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// Final blob placement.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `UPLOADHUB__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("UPLOADHUB")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("uploads.allowed_content_types"),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject combinations that would make every upload fail.
    pub fn validate(&self) -> Result<(), AppError> {
        let uploads = &self.uploads;
        if uploads.max_file_size_bytes <= 0 {
            return Err(AppError::configuration(
                "uploads.max_file_size_bytes must be positive",
            ));
        }
        if uploads.default_chunk_size_bytes <= 0 || uploads.max_chunk_size_bytes <= 0 {
            return Err(AppError::configuration(
                "uploads chunk sizes must be positive",
            ));
        }
        if uploads.default_chunk_size_bytes > uploads.max_chunk_size_bytes {
            return Err(AppError::configuration(
                "uploads.default_chunk_size_bytes exceeds uploads.max_chunk_size_bytes",
            ));
        }
        if uploads.session_ttl_seconds == 0 || uploads.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(AppError::configuration(format!(
                "uploads.session_ttl_seconds must be between 1 and {MAX_SESSION_TTL_SECONDS}"
            )));
        }
        if self.worker.enabled && self.worker.expiry_sweep_cron.trim().is_empty() {
            return Err(AppError::configuration(
                "worker.expiry_sweep_cron must be set when the worker is enabled",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.uploads.max_active_sessions_per_actor, 3);
        assert_eq!(config.worker.expiry_sweep_cron, "0 */15 * * * *");
    }

    #[test]
    fn test_default_chunk_above_max_rejected() {
        let mut config = AppConfig::default();
        config.uploads.default_chunk_size_bytes = config.uploads.max_chunk_size_bytes + 1;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let raw = r#"
            [uploads]
            max_active_sessions_per_actor = 5

            [database]
            provider = "memory"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.uploads.max_active_sessions_per_actor, 5);
        assert_eq!(config.uploads.default_chunk_size_bytes, 8 * 1024 * 1024);
        assert_eq!(
            config.database.provider,
            database::StoreProvider::Memory
        );
    }
}
