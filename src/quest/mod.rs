//! Quest System Module
//!
//! Catalog-driven quest progression: acceptance gating, objective progress
//! from gameplay events, completion, turn-in with follow-up auto-accept, and
//! save/load of the runtime state.

pub mod catalog;
pub mod definition;
pub mod events;
pub mod manager;
pub mod persistence;
pub mod state;

pub use catalog::QuestCatalog;
pub use definition::{
    ItemReward, Objective, ObjectiveId, ObjectiveType, QuestDefinition, QuestId, QuestKind, Reward, TargetId,
};
pub use events::{GameplayEvent, QuestEvent, QuestEventKind, QuestObservers};
pub use manager::{AcceptRefusal, QuestManager};
pub use persistence::SerializableState;
pub use state::{ActiveQuest, QuestProgressSnapshot, QuestStateStore, QuestStatus};
