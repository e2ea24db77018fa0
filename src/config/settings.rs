//! Link settings

use crate::core::transport::SerialConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No platform configuration directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// File could not be read or written
    #[error("Config file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings could not be serialized
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting name
        field: &'static str,
        /// What was wrong
        reason: String,
    },
}

/// Complete link configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port settings
    pub serial: SerialConfig,
    /// Exchange settings
    pub protocol: ProtocolConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Exchange settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Resends allowed per exchange
    pub retries: u32,
    /// Engineering data chunks accepted before giving up
    pub max_engdata_chunks: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            retries: 0,
            max_engdata_chunks: 128,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `senselink_core=debug`
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LinkConfig {
    /// Load config from the default location, or defaults if there is none
    pub fn load() -> Result<Self, ConfigError> {
        match super::default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load config from a file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = super::default_config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_error)?;
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "serial.baud_rate",
                reason: "must be non-zero".to_string(),
            });
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(ConfigError::InvalidValue {
                field: "serial.data_bits",
                reason: format!("{} is not 5-8", self.serial.data_bits),
            });
        }
        if !(1..=2).contains(&self.serial.stop_bits) {
            return Err(ConfigError::InvalidValue {
                field: "serial.stop_bits",
                reason: format!("{} is not 1 or 2", self.serial.stop_bits),
            });
        }
        if self.protocol.max_engdata_chunks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "protocol.max_engdata_chunks",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::SerialParity;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.serial.baud_rate, 38_400);
        assert_eq!(config.serial.timeout_ms, 1000);
        assert_eq!(config.protocol.retries, 0);
        assert_eq!(config.protocol.max_engdata_chunks, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = LinkConfig::default();
        config.serial.port = "/dev/ttyACM3".to_string();
        config.serial.parity = SerialParity::Even;
        config.protocol.retries = 4;
        config.logging.json = true;
        config.save_to(&path).unwrap();

        assert_eq!(LinkConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[protocol]\nretries = 2\n").unwrap();

        let config = LinkConfig::load_from(&path).unwrap();
        assert_eq!(config.protocol.retries, 2);
        assert_eq!(config.protocol.max_engdata_chunks, 128);
        assert_eq!(config.serial.baud_rate, 38_400);
    }

    #[test]
    fn test_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[serial]\ndata_bits = 9\n").unwrap();
        assert!(matches!(
            LinkConfig::load_from(&path),
            Err(ConfigError::InvalidValue { field: "serial.data_bits", .. })
        ));

        std::fs::write(&path, "[serial\nport = ").unwrap();
        assert!(matches!(LinkConfig::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            LinkConfig::load_from(&dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
