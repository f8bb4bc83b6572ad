//! Configuration module for motofix-server.
//!
//! Handles loading configuration from the TOML file, CLI arguments, and
//! environment variables.

pub mod file;

use crate::config::file::FileConfig;
use motofix_core::processors::InboxProcessorConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use time::UtcOffset;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            config.server.listen = listen;
        }

        self.validate(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.worker.max_attempts < 1 {
            return Err(ConfigError::ValidationError(
                "worker.max_attempts must be at least 1".into(),
            ));
        }
        if config.worker.claim_batch_size < 1 {
            return Err(ConfigError::ValidationError(
                "worker.claim_batch_size must be at least 1".into(),
            ));
        }
        if config.worker.max_concurrency < 1 {
            return Err(ConfigError::ValidationError(
                "worker.max_concurrency must be at least 1".into(),
            ));
        }
        if config.sweep.daily_hour > 23 {
            return Err(ConfigError::ValidationError(format!(
                "sweep.daily_hour {} is not a valid hour",
                config.sweep.daily_hour
            )));
        }
        if !(-12..=14).contains(&config.sweep.utc_offset_hours) {
            return Err(ConfigError::ValidationError(format!(
                "sweep.utc_offset_hours {} is not a valid UTC offset",
                config.sweep.utc_offset_hours
            )));
        }
        Ok(())
    }
}

impl file::WorkerConfig {
    /// Build the processor config consumed by `InboxProcessor`.
    pub fn to_processor_config(&self) -> InboxProcessorConfig {
        InboxProcessorConfig {
            batch_size: self.claim_batch_size,
            max_attempts: self.max_attempts,
            max_concurrency: self.max_concurrency,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            ..InboxProcessorConfig::default()
        }
    }
}

impl file::SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_hours * 60 * 60)
    }

    pub fn utc_offset(&self) -> UtcOffset {
        UtcOffset::from_hms(self.utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC)
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_hour_is_rejected() {
        let loader = ConfigLoader::new("/dev/null", None);
        let mut config: FileConfig = toml::from_str(
            r#"
[server]
[push]
endpoint = "https://push.example.com/send"
"#,
        )
        .unwrap();
        config.sweep.daily_hour = 24;
        assert!(matches!(
            loader.validate(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn sweep_conversions() {
        let sweep = file::SweepConfig::default();
        assert_eq!(sweep.dedup_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(sweep.utc_offset().whole_hours(), 7);
    }
}
