//! Configuration file handling for `~/.imageloader/config.ini`.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::defaults::default_cache_budget;
use super::loader::LoaderConfig;
use super::settings::ConfigFile;

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Loads from `~/.imageloader/config.ini`, or defaults if absent.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Writes to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }
        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Resolves `auto` values against this machine.
    pub fn to_loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            worker_count: self.loader.workers,
            queue_policy: self.loader.queue_policy,
            cache_budget_bytes: self.cache.memory_size.unwrap_or_else(default_cache_budget),
        }
    }
}

/// `~/.imageloader`, or `./.imageloader` without a home directory.
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".imageloader")
}

pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::QueuePolicy;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.loader.workers = 6;
        config.loader.queue_policy = QueuePolicy::Fifo;
        config.cache.memory_size = Some(32 * 1024 * 1024);
        config.save_to(&path).unwrap();

        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_invalid_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[loader]\nworkers = many\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidValue { .. }));
    }

    #[test]
    fn test_to_loader_config() {
        let mut config = ConfigFile::default();
        config.loader.workers = 2;
        config.cache.memory_size = Some(1024);

        let loader = config.to_loader_config();
        assert_eq!(loader, LoaderConfig::new(2, QueuePolicy::Lifo, 1024));

        config.cache.memory_size = None;
        assert_eq!(config.to_loader_config().cache_budget_bytes, default_cache_budget());
    }

    #[test]
    fn test_config_path() {
        assert!(config_file_path().ends_with(".imageloader/config.ini"));
    }
}
