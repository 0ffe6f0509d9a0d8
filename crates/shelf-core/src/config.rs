//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/shelf/config.toml)
//! 3. Environment variables (SHELF_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{DEFAULT_CATALOG_URL, DEFAULT_MAX_RESULTS};
use crate::query::DEFAULT_TOP_N;

/// Environment variable prefix
const ENV_PREFIX: &str = "SHELF";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the library entries
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Catalog service base URL
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// Catalog API key (optional)
    #[serde(default)]
    pub catalog_api_key: Option<String>,

    /// Results per search page
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Entries in top category/author lists
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Log file, used when SHELF_LOG is set (stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_url: default_catalog_url(),
            catalog_api_key: None,
            max_results: default_max_results(),
            top_n: default_top_n(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (SHELF_DATA_DIR, SHELF_CATALOG_URL, ...)
    /// 2. Config file (~/.config/shelf/config.toml or SHELF_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from an explicit path when given (`--config`), else the default
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // SHELF_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // SHELF_CATALOG_URL
        if let Ok(val) = std::env::var(format!("{}_CATALOG_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.catalog_url = val;
            }
        }

        // SHELF_CATALOG_API_KEY
        if let Ok(val) = std::env::var(format!("{}_CATALOG_API_KEY", ENV_PREFIX)) {
            self.catalog_api_key = if val.is_empty() { None } else { Some(val) };
        }

        // SHELF_MAX_RESULTS
        if let Ok(val) = std::env::var(format!("{}_MAX_RESULTS", ENV_PREFIX)) {
            match val.parse() {
                Ok(n) => self.max_results = n,
                Err(_) => tracing::warn!(value = %val, "Ignoring invalid SHELF_MAX_RESULTS"),
            }
        }

        // SHELF_TOP_N
        if let Ok(val) = std::env::var(format!("{}_TOP_N", ENV_PREFIX)) {
            match val.parse() {
                Ok(n) => self.top_n = n,
                Err(_) => tracing::warn!(value = %val, "Ignoring invalid SHELF_TOP_N"),
            }
        }

        // SHELF_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with SHELF_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shelf")
            .join("config.toml")
    }

    /// Directory holding the `<key>.json` entries
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("library")
    }

    /// Log file to use when logging is enabled
    pub fn log_path(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}
