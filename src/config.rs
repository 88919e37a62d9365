//! Driver configuration, read from a TOML file.
//!
//! ```toml
//! data_dir = "data"
//! log_filter = "quest_engine=info"
//!
//! [save]
//! backend = "sqlite"
//! database_url = "sqlite:quests.db?mode=rwc"
//! save_dir = "saves"
//! slot = "default"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory containing `quests/`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Tracing filter used when `RUST_LOG` is unset or empty
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub save: SaveConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveBackend {
    Sqlite,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveConfig {
    #[serde(default = "default_backend")]
    pub backend: SaveBackend,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default = "default_slot")]
    pub slot: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_filter() -> String {
    "quest_engine=info".to_string()
}

fn default_backend() -> SaveBackend {
    SaveBackend::Sqlite
}

fn default_database_url() -> String {
    "sqlite:quests.db?mode=rwc".to_string()
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_slot() -> String {
    "default".to_string()
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: default_database_url(),
            save_dir: default_save_dir(),
            slot: default_slot(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_filter: default_log_filter(),
            save: SaveConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the tracing filter. A non-empty `rust_log` replaces `log_filter`.
    pub fn env_filter(&self, rust_log: Option<&str>) -> Result<EnvFilter, ConfigError> {
        let filter = match rust_log.map(str::trim) {
            Some(env) if !env.is_empty() => env,
            _ => self.log_filter.as_str(),
        };
        EnvFilter::try_new(filter).map_err(|source| ConfigError::LogFilter {
            filter: filter.to_string(),
            source,
        })
    }
}
