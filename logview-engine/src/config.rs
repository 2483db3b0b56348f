//! Configuration loading for the sync engine.
//!
//! Configuration is loaded from a TOML file (default: `engine.toml`). Every
//! field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Synchronization timing.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Synchronization timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Period of the background trigger in milliseconds (default: 2000).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Minimum spacing between two passes in milliseconds (default: 1000).
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

// Default value functions
fn default_interval_ms() -> u64 {
    2_000
}

fn default_min_spacing_ms() -> u64 {
    1_000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl SyncConfig {
    /// Period of the background trigger.
    ///
    /// Never zero; tokio intervals refuse a zero period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Minimum spacing between passes.
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Parsed, but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.sync.interval(), Duration::from_secs(2));
        assert_eq!(config.sync.min_spacing(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[sync]
interval_ms = 500
min_spacing_ms = 250
"#;
        let config: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.sync.interval(), Duration::from_millis(500));
        assert_eq!(config.sync.min_spacing(), Duration::from_millis(250));
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());

        let config: EngineConfig = toml::from_str("[sync]\ninterval_ms = 10\n").unwrap();
        assert_eq!(config.sync.min_spacing_ms, 1_000);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config: EngineConfig = toml::from_str("[sync]\ninterval_ms = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.sync.interval(), Duration::from_millis(1));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync]\nmin_spacing_ms = 0").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sync.min_spacing(), Duration::ZERO);
    }

    #[test]
    fn from_file_reports_path_on_errors() {
        let missing = Path::new("/definitely/not/here/engine.toml");
        let err = EngineConfig::from_file(missing).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
        assert!(err.to_string().contains("engine.toml"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[sync\nbroken").unwrap();
        let err = EngineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn toml_round_trip_keeps_values() {
        let config = EngineConfig {
            sync: SyncConfig {
                interval_ms: 750,
                min_spacing_ms: 300,
            },
        };
        let back: EngineConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(back, config);
    }
}
