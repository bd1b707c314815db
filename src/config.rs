//! Configuration loading and management
//!
//! Handles parsing of `.dogether.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::Backend;

/// File name looked up in the working directory
pub const CONFIG_FILE: &str = ".dogether.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Acting user configuration
    #[serde(default)]
    pub user: UserConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: Backend,

    /// Where the file backend keeps its tables. Defaults to the platform
    /// data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// How long to wait for a list or user lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: None,
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// Configured data directory, or the platform default
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        directories::ProjectDirs::from("", "", "dogether")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".dogether"))
    }
}

/// Acting-user configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    /// User id to act as when nothing else selects one
    #[serde(default)]
    pub default: String,
}

impl Config {
    /// Load configuration from a `.dogether.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        if let Some(dir) = &self.storage.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(
                    "storage.data_dir cannot be empty".to_string(),
                ));
            }
        }
        if self.user.default.trim() != self.user.default {
            return Err(Error::InvalidConfig(
                "user.default cannot have surrounding whitespace".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, Backend::File);
        assert_eq!(config.storage.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
        assert!(config.storage.data_dir.is_none());
        assert!(config.user.default.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[storage]
backend = "memory"
data_dir = "/tmp/dogether"
lock_timeout_ms = 250

[user]
default = "01hzzzzzzzzzzzzzzzzzzzzzzz"
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.backend, Backend::Memory);
        assert_eq!(
            config.storage.resolved_data_dir(),
            PathBuf::from("/tmp/dogether")
        );
        assert_eq!(config.storage.lock_timeout_ms, 250);
        assert_eq!(config.user.default, "01hzzzzzzzzzzzzzzzzzzzzzzz");
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[storage]\nbackend = \"sqlite\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "[storage]\nlock_timeout_ms = 0\n").expect("write config");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        // Directory lookup falls back to defaults on invalid files
        let config = Config::load_from_dir(temp.path());
        assert_eq!(config.storage.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);

        let mut config = Config::default();
        config.storage.data_dir = Some(temp.path().join("data"));
        config.user.default = "someone".to_string();
        config.save(&path).expect("save");

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.storage.data_dir, config.storage.data_dir);
        assert_eq!(loaded.user.default, "someone");
    }
}
