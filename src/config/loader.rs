//! Configuration file loader.

use std::path::{Path, PathBuf};

use super::RelayConfig;

/// File name looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = "feed-relay.toml";

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

        // 1. Current directory: feed-relay.toml
        search_paths.push(PathBuf::from(LOCAL_CONFIG_FILE));

        // 2. User config directory: ~/.config/feed-relay/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("feed-relay").join("config.toml"));
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

    /// Load and validate configuration from the first available file.
    ///
    /// # Errors
    ///
    /// Returns an error if no config file exists, or if the first existing
    /// file cannot be read, parsed or validated.
    pub fn load(&self) -> Result<RelayConfig, ConfigError> {
        let path = self.find_config_file().ok_or_else(|| ConfigError::NotFound {
            searched: self.search_paths.clone(),
        })?;

        tracing::debug!(path = %path.display(), "Loading config file");
        let config = Self::load_from_path(&path)?;
        config
            .validate()
            .map_err(|reason| ConfigError::Invalid { path, reason })?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
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
    #[error("No config file found (searched: {searched:?})")]
    NotFound { searched: Vec<PathBuf> },

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

    #[error("Invalid config file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
