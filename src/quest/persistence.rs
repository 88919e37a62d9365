//! Quest Save State
//!
//! JSON-safe flattening of the state store: keyed collections become arrays
//! of `[id, value]` pairs, sets become arrays of ids. Decoding from JSON is
//! lenient so a damaged save degrades to empty collections instead of failing.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::definition::QuestId;
use super::state::{ActiveQuest, QuestProgressSnapshot, QuestStateStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializableState {
    #[serde(default)]
    pub active_quests: Vec<(QuestId, ActiveQuest)>,
    #[serde(default)]
    pub completed_quests: Vec<QuestId>,
    #[serde(default)]
    pub turned_in_quests: Vec<QuestId>,
    #[serde(default)]
    pub quest_progress: Vec<(QuestId, QuestProgressSnapshot)>,
}

impl SerializableState {
    pub fn export(store: &QuestStateStore) -> Self {
        Self {
            active_quests: store
                .active_quests
                .iter()
                .map(|(id, quest)| (*id, quest.clone()))
                .collect(),
            completed_quests: store.completed_quests.iter().copied().collect(),
            turned_in_quests: store.turned_in_quests.iter().copied().collect(),
            quest_progress: store
                .quest_progress
                .iter()
                .map(|(id, snapshot)| (*id, snapshot.clone()))
                .collect(),
        }
    }

    /// Rebuild a state store, dropping entries that would break its invariants.
    /// Progress snapshots of active quests are rebuilt from the sanitized
    /// objectives; snapshots of anything not active or turned in are dropped.
    pub fn into_store(self) -> QuestStateStore {
        let mut store = QuestStateStore::new();
        store.completed_quests.extend(self.completed_quests);
        store.turned_in_quests.extend(self.turned_in_quests);

        for (id, mut quest) in self.active_quests {
            if quest.id() != id {
                warn!("Dropping saved quest under key {}: it carries id {}", id, quest.id());
                continue;
            }
            if !quest.status.is_stored_active() {
                warn!("Dropping saved quest {} with status {}", id, quest.status.as_str());
                continue;
            }
            if store.is_turned_in(id) && !quest.quest.repeatable {
                warn!("Dropping saved quest {}: already turned in and not repeatable", id);
                continue;
            }
            quest.sanitize();
            store.active_quests.insert(id, quest);
        }

        for (id, snapshot) in self.quest_progress {
            if snapshot.quest_id != id {
                warn!("Dropping progress under key {}: it carries id {}", id, snapshot.quest_id);
                continue;
            }
            if store.is_active(id) {
                continue;
            }
            if store.is_turned_in(id) {
                store.quest_progress.insert(id, snapshot);
            } else {
                warn!("Dropping progress for quest {}: not active or turned in", id);
            }
        }

        let active: Vec<QuestId> = store.active_quests.keys().copied().collect();
        for id in active {
            store.record_progress(id);
        }

        store
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a saved state, keeping whatever parts are intact
    pub fn from_json(json: &str) -> Self {
        let value: Value = match serde_json::from_str(json) {
            Ok(value) => value,
            Err(e) => {
                warn!("Quest save is not valid JSON, starting empty: {}", e);
                return Self::default();
            }
        };

        let Value::Object(mut fields) = value else {
            warn!("Quest save is not a JSON object, starting empty");
            return Self::default();
        };

        Self {
            active_quests: take_entries(&mut fields, "activeQuests"),
            completed_quests: take_entries(&mut fields, "completedQuests"),
            turned_in_quests: take_entries(&mut fields, "turnedInQuests"),
            quest_progress: take_entries(&mut fields, "questProgress"),
        }
    }
}

/// Decode an array field entry by entry, skipping malformed entries
fn take_entries<T: DeserializeOwned>(fields: &mut Map<String, Value>, name: &str) -> Vec<T> {
    let entries = match fields.remove(name) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            warn!("Quest save field '{}' is not an array, using empty", name);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Skipping malformed '{}' entry {}: {}", name, index, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::definition::{Objective, ObjectiveType, QuestDefinition, QuestKind};
    use crate::quest::state::QuestStatus;

    fn store_with_progress() -> QuestStateStore {
        let definition = QuestDefinition::new(2, "The Rat Infestation", QuestKind::Main)
            .with_objective(Objective::new(1, ObjectiveType::KillEnemy).with_target(1).with_count(5));

        let mut store = QuestStateStore::new();
        store.insert_active(ActiveQuest::accept(&definition));
        store.active_quests.get_mut(&2).unwrap().objective_mut(1).unwrap().add_progress(3);
        store.record_progress(2);
        store.completed_quests.insert(1);
        store.turned_in_quests.insert(1);
        store
    }

    #[test]
    fn test_json_round_trip() {
        let store = store_with_progress();
        let json = SerializableState::export(&store).to_json().unwrap();

        let restored = SerializableState::from_json(&json).into_store();
        assert_eq!(restored, store);
    }

    #[test]
    fn test_json_shape_uses_pairs() {
        let json = SerializableState::export(&store_with_progress()).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["activeQuests"][0][0], 2);
        assert_eq!(value["activeQuests"][0][1]["status"], "ACTIVE");
        assert_eq!(value["activeQuests"][0][1]["quest"]["objectives"][0]["currentCount"], 3);
        assert_eq!(value["turnedInQuests"], serde_json::json!([1]));
        assert_eq!(value["questProgress"][0][1]["objectives"][0]["current"], 3);
    }

    #[test]
    fn test_garbage_loads_empty() {
        assert_eq!(SerializableState::from_json("not json"), SerializableState::default());
        assert_eq!(SerializableState::from_json("[1, 2]"), SerializableState::default());
        assert_eq!(SerializableState::from_json("{}"), SerializableState::default());
    }

    #[test]
    fn test_partial_corruption_keeps_good_fields() {
        let state = SerializableState::from_json(
            r#"{
                "activeQuests": "oops",
                "completedQuests": [1, "two", 3],
                "turnedInQuests": [1, 3]
            }"#,
        );

        assert!(state.active_quests.is_empty());
        assert_eq!(state.completed_quests, vec![1, 3]);
        assert_eq!(state.turned_in_quests, vec![1, 3]);
        assert!(state.quest_progress.is_empty());
    }

    #[test]
    fn test_import_sanitizes_entries() {
        let store = store_with_progress();
        let mut state = SerializableState::export(&store);

        let mut wrong_key = state.active_quests[0].1.clone();
        wrong_key.quest.id = 9;
        state.active_quests.push((10, wrong_key));

        let mut failed = state.active_quests[0].1.clone();
        failed.quest.id = 11;
        failed.status = QuestStatus::Failed;
        state.active_quests.push((11, failed));

        state.active_quests[0].1.quest.objectives[0].current_count = 40;
        state.quest_progress.clear();

        let restored = state.into_store();
        assert_eq!(restored.active_quests.len(), 1);
        assert_eq!(restored.active_quests[&2].objectives()[0].current_count, 5);
        assert!(restored.quest_progress.contains_key(&2));
    }

    #[test]
    fn test_import_rebuilds_stale_progress() {
        let mut state = SerializableState::export(&store_with_progress());
        state.active_quests[0].1.quest.objectives[0].current_count = 40;
        state.quest_progress[0].1.objectives[0].current = 40;

        let mut orphan = state.quest_progress[0].1.clone();
        orphan.quest_id = 7;
        state.quest_progress.push((7, orphan));

        let restored = state.into_store();
        let active = &restored.active_quests[&2].objectives()[0];
        let snapshot = &restored.quest_progress[&2].objectives[0];
        assert_eq!(active.current_count, 5);
        assert_eq!(snapshot.current, 5);
        assert!(snapshot.completed);
        assert!(!restored.quest_progress.contains_key(&7));
    }

    #[test]
    fn test_import_drops_active_copy_of_turned_in_quest() {
        let mut state = SerializableState::export(&store_with_progress());
        state.turned_in_quests.push(2);

        let restored = state.into_store();
        assert!(!restored.is_active(2));
        assert!(restored.is_turned_in(2));

        let mut state = SerializableState::export(&store_with_progress());
        state.turned_in_quests.push(2);
        state.active_quests[0].1.quest.repeatable = true;

        let restored = state.into_store();
        assert!(restored.is_active(2));
        assert!(restored.is_turned_in(2));
    }
}
