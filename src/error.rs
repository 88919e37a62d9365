//! Error types for the quest engine.
//!
//! Gameplay validation failures are not errors here: the engine reports them
//! as `false`/`None` returns. These types cover startup and I/O boundaries.

use std::path::PathBuf;

use thiserror::Error;

use crate::quest::QuestId;

/// Fatal problems building the quest catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Duplicate quest id {0} in catalog")]
    DuplicateQuest(QuestId),

    #[error("Failed to read quest directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the save-state store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Save file error at {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode quest state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid save slot name '{0}'")]
    InvalidSlot(String),
}

/// Problems loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid log filter '{filter}': {source}")]
    LogFilter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}
