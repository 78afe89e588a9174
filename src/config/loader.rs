//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::types::AppConfig;
use crate::monitor::MonitorOptions;
use crate::parser::PatternError;

/// Configuration loader that searches multiple locations.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Search paths in order of priority.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default search paths.
    #[must_use]
    pub fn new() -> Self {
        let mut search_paths = Vec::new();

        // 1. Current directory: .gamelog-monitor.toml
        search_paths.push(PathBuf::from(".gamelog-monitor.toml"));

        // 2. User config directory: ~/.config/gamelog-monitor/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("gamelog-monitor").join("config.toml"));
        }

        Self { search_paths }
    }

    /// Create a config loader with a specific config file path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            search_paths: vec![path],
        }
    }

    /// Load configuration and build the monitor options it describes.
    ///
    /// Configured line patterns are compiled here, once, so a bad regex is
    /// reported against the file it came from.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// one of its patterns is invalid.
    pub fn load_options(&self) -> Result<MonitorOptions, ConfigError> {
        let Some(path) = self.find_config_file() else {
            tracing::debug!("No config file found, using default monitor options");
            return Ok(MonitorOptions::default());
        };

        tracing::debug!(path = %path.display(), "Loading config file");
        let config = Self::load_from_path(&path)?;
        let options = config
            .monitor_options()
            .map_err(|e| ConfigError::InvalidPattern {
                path: path.clone(),
                source: e,
            })?;

        tracing::debug!(
            path = %path.display(),
            patterns = options.patterns.len(),
            "Loaded monitor options"
        );
        Ok(options)
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the search paths for debugging.
    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Find the first config file that exists.
    #[must_use]
    pub fn find_config_file(&self) -> Option<PathBuf> {
        self.search_paths.iter().find(|p| p.exists()).cloned()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid line pattern in config file {path}: {source}")]
    InvalidPattern {
        path: PathBuf,
        source: PatternError,
    },
}
