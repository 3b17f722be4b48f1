//! Configuration management for darkroom.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`, so a missing file or a
//! partial file both work.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for darkroom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage backend settings
    pub storage: StorageConfig,

    /// Queue settings
    pub queue: QueueConfig,

    /// Eligibility rules
    pub filter: FilterConfig,

    /// Derived artifact layout
    pub artifacts: ArtifactConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.darkroom.darkroom/config.toml
    /// - Linux: ~/.config/darkroom/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\darkroom\config\config.toml
    ///
    /// Falls back to ~/.darkroom/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "darkroom", "darkroom")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".darkroom").join("config.toml")
            })
    }

    /// Resolved root directory for the `local` storage backend.
    pub fn storage_root(&self) -> Result<PathBuf, ConfigError> {
        expand_path(&self.storage.root)
    }

    /// Resolved path of the JSONL queue spool.
    pub fn spool_path(&self) -> Result<PathBuf, ConfigError> {
        expand_path(&self.queue.spool)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Expand `~` and `${VAR}` references in a configured path.
fn expand_path(path: &Path) -> Result<PathBuf, ConfigError> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| {
        ConfigError::ValidationError(format!("cannot expand path {raw:?}: {e}"))
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
