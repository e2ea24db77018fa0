//! Configuration module
//!
//! Handles link settings loaded from `config.toml`

mod settings;

pub use settings::{ConfigError, LinkConfig, LoggingConfig, ProtocolConfig};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Config file name inside the configuration directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "senselink", "Senselink").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file path
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CONFIG_FILE))
}
