//! Configuration file support.
//!
//! Config is loaded from `~/.assign-task/config.toml` (or the path given with
//! `--config`). Only the three secrets can be overridden from the environment:
//! the store token, the gist id and the recipient's shared secret.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_GITHUB_TOKEN: &str = "ASSIGN_TASK_GITHUB_TOKEN";
pub const ENV_GIST_ID: &str = "ASSIGN_TASK_GIST_ID";
pub const ENV_RECIPIENT_SECRET: &str = "ASSIGN_TASK_RECIPIENT_SECRET";

const DATA_DIR_NAME: &str = ".assign-task";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub access: AccessConfig,
    pub log: LogConfig,
}

/// Where the shared task document lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// GitHub API root (default: "https://api.github.com")
    pub api_base: String,
    pub gist_id: String,
    /// Bearer token sent as `Authorization: token ...`
    pub token: String,
    /// File inside the gist holding the task array (default: "tasks.json")
    pub file_name: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            gist_id: String::new(),
            token: String::new(),
            file_name: "tasks.json".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Who may use which view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Email suffix every caller must have (default: "@mathco.com")
    pub domain: String,
    /// The single identity all tasks are assigned to
    pub recipient: String,
    /// Shared secret that unlocks the recipient's task list
    pub recipient_secret: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            domain: "@mathco.com".to_string(),
            recipient: "vivek.joon@mathco.com".to_string(),
            recipient_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// flexi_logger spec, e.g. "info" or "assign_task=debug"
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `~/.assign-task`, or `./.assign-task` when no home directory is known.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

pub fn default_config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE_NAME)
}

impl Config {
    /// Load config from `path`, apply secret overrides from the environment.
    /// A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace secrets with non-empty values returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let pick = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = pick(ENV_GITHUB_TOKEN) {
            self.store.token = token;
        }
        if let Some(gist_id) = pick(ENV_GIST_ID) {
            self.store.gist_id = gist_id;
        }
        if let Some(secret) = pick(ENV_RECIPIENT_SECRET) {
            self.access.recipient_secret = secret;
        }
    }
}
