//! Load: config loading from file and environment variables.

use std::path::{Path, PathBuf};

use super::model::{ConfigError, LoggerConfig};

pub const DEFAULT_CONFIG_FILE: &str = "logger.toml";

impl LoggerConfig {
    /// Load configuration.
    /// Priority: Environment Variables > Config File > Defaults
    ///
    /// `path` overrides `LOGGER_CONFIG_FILE`. A missing file is only an
    /// error when it was named explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path, |key| std::env::var(key).ok())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (path, explicit) = match (path, env("LOGGER_CONFIG_FILE")) {
            (Some(path), _) => (path.to_path_buf(), true),
            (None, Some(path)) => (PathBuf::from(path), true),
            (None, None) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !explicit && !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        tracing::info!("Loading configuration from: {}", path.display());
        Self::from_file(&path)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Environment variables override file config
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = env("LOGGER_PORT") {
            self.port = port;
        }
        if let Some(baud) = env("LOGGER_BAUD_RATE") {
            self.baud_rate = baud
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("LOGGER_BAUD_RATE is not a number: {}", baud)))?;
        }
        if let Some(dir) = env("LOGGER_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}
