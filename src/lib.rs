//! Quest progression engine.
//!
//! The engine itself ([`quest::QuestManager`]) is synchronous and
//! renderer-agnostic. [`db`] and [`config`] are the adapters the driver
//! binary wires around it.

pub mod config;
pub mod db;
pub mod error;
pub mod quest;

pub use error::{CatalogError, ConfigError, StoreError};
pub use quest::{QuestCatalog, QuestManager, SerializableState};
