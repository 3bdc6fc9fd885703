//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/pvault/config.toml)
//! 3. Environment variables (PVAULT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "PVAULT";

/// Default model used for prompt refinement
pub const DEFAULT_REFINE_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the refinement API
pub const DEFAULT_REFINE_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for data storage (SQLite db)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upper bound on the database size in bytes (unbounded when unset)
    #[serde(default)]
    pub storage_quota_bytes: Option<u64>,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Prompt refinement settings
    #[serde(default)]
    pub refine: RefineConfig,
}

/// Settings for the remote prompt refinement service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// API key; refinement is unavailable without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_refine_model")]
    pub model: String,

    #[serde(default = "default_refine_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_refine_timeout")]
    pub timeout_secs: u64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_refine_model(),
            base_url: default_refine_base_url(),
            timeout_secs: default_refine_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_quota_bytes: None,
            log_file: None,
            refine: RefineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PVAULT_DATA_DIR, PVAULT_STORAGE_QUOTA, ...)
    /// 2. Config file (~/.config/pvault/config.toml or PVAULT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path from the command line
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
        // PVAULT_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // PVAULT_STORAGE_QUOTA (bytes; empty or unparsable clears it)
        if let Ok(val) = std::env::var(format!("{}_STORAGE_QUOTA", ENV_PREFIX)) {
            self.storage_quota_bytes = val.trim().parse().ok();
        }

        // PVAULT_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // PVAULT_API_KEY, then GEMINI_API_KEY
        let api_key = std::env::var(format!("{}_API_KEY", ENV_PREFIX))
            .or_else(|_| std::env::var("GEMINI_API_KEY"));
        if let Ok(val) = api_key {
            self.refine.api_key = if val.trim().is_empty() {
                None
            } else {
                Some(val)
            };
        }

        // PVAULT_REFINE_MODEL
        if let Ok(val) = std::env::var(format!("{}_REFINE_MODEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.refine.model = val;
            }
        }
    }

    /// Save configuration to the default config file
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
    /// Can be overridden with PVAULT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pvault")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("pvault.db")
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pvault")
}

fn default_refine_model() -> String {
    DEFAULT_REFINE_MODEL.to_string()
}

fn default_refine_base_url() -> String {
    DEFAULT_REFINE_BASE_URL.to_string()
}

fn default_refine_timeout() -> u64 {
    30
}
