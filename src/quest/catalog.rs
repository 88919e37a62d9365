//! Quest Catalog
//!
//! Loads and holds the static quest definitions. Read-only once built; the
//! engine shares it behind an `Arc`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::definition::{QuestDefinition, QuestId, QuestKind, RawQuestFile};
use crate::error::CatalogError;

/// Registry for all quest definitions, ordered by quest id
#[derive(Debug, Clone, Default)]
pub struct QuestCatalog {
    quests: BTreeMap<QuestId, QuestDefinition>,
}

impl QuestCatalog {
    /// Build a catalog from already-resolved definitions.
    /// Duplicate ids are fatal.
    pub fn load(definitions: impl IntoIterator<Item = QuestDefinition>) -> Result<Self, CatalogError> {
        let mut quests = BTreeMap::new();
        for quest in definitions {
            let id = quest.id;
            if quests.insert(id, quest).is_some() {
                return Err(CatalogError::DuplicateQuest(id));
            }
        }

        let catalog = Self { quests };
        catalog.validate_references();
        Ok(catalog)
    }

    /// Load all quest definitions from `<data_dir>/quests`
    pub fn load_from_directory(data_dir: &Path) -> Result<Self, CatalogError> {
        let quest_dir = data_dir.join("quests");
        info!("Loading quests from {:?}", quest_dir);

        if !quest_dir.exists() {
            warn!("Quest directory does not exist: {:?}", quest_dir);
            return Ok(Self::default());
        }

        let mut paths = Vec::new();
        collect_toml_files(&quest_dir, &mut paths)?;
        paths.sort();

        let mut definitions = Vec::with_capacity(paths.len());
        for path in paths {
            match load_quest_file(&path) {
                Ok(quest) => {
                    info!("Loaded quest: {} ({})", quest.name, quest.id);
                    definitions.push(quest);
                }
                Err(e) => warn!("Failed to load quest {:?}: {}", path, e),
            }
        }

        let catalog = Self::load(definitions)?;
        info!("Loaded {} quest definitions", catalog.len());
        Ok(catalog)
    }

    /// Warn about prerequisite, follow-up and unlock ids that name no quest
    fn validate_references(&self) {
        for quest in self.quests.values() {
            for referenced in quest.referenced_quests() {
                if !self.quests.contains_key(&referenced) {
                    warn!(
                        "Quest {} references non-existent quest {}",
                        quest.id, referenced
                    );
                }
            }
        }
    }

    /// Get a quest by ID
    pub fn get_quest(&self, quest_id: QuestId) -> Option<&QuestDefinition> {
        self.quests.get(&quest_id)
    }

    /// All quests of one kind, in id order
    pub fn get_quests_by_type(&self, kind: QuestKind) -> Vec<&QuestDefinition> {
        self.quests.values().filter(|q| q.kind == kind).collect()
    }

    pub fn all(&self) -> impl Iterator<Item = &QuestDefinition> {
        self.quests.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = QuestId> + '_ {
        self.quests.keys().copied()
    }

    pub fn contains(&self, quest_id: QuestId) -> bool {
        self.quests.contains_key(&quest_id)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

/// Recursively collect quest files
fn collect_toml_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();

        if path.is_dir() {
            collect_toml_files(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }

    Ok(())
}

fn load_quest_file(path: &Path) -> Result<QuestDefinition, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;

    let raw: RawQuestFile = toml::from_str(&content)
        .map_err(|e| format!("Failed to parse {:?}: {}", path, e))?;

    QuestDefinition::from_raw(&raw.quest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::definition::{Objective, ObjectiveType};
    use tempfile::TempDir;

    fn talk_quest(id: QuestId, kind: QuestKind) -> QuestDefinition {
        QuestDefinition::new(id, format!("Quest {id}"), kind)
            .with_objective(Objective::new(1, ObjectiveType::TalkToNpc).with_target(1))
    }

    #[test]
    fn test_duplicate_ids_are_fatal() {
        let result = QuestCatalog::load(vec![
            talk_quest(1, QuestKind::Main),
            talk_quest(1, QuestKind::Side),
        ]);
        assert!(matches!(result, Err(CatalogError::DuplicateQuest(1))));
    }

    #[test]
    fn test_lookup_and_filter() {
        let catalog = QuestCatalog::load(vec![
            talk_quest(3, QuestKind::Side),
            talk_quest(1, QuestKind::Main),
            talk_quest(2, QuestKind::Side),
        ])
        .unwrap();

        assert_eq!(catalog.get_quest(1).map(|q| q.kind), Some(QuestKind::Main));
        assert!(catalog.get_quest(99).is_none());

        let side: Vec<QuestId> = catalog.get_quests_by_type(QuestKind::Side).iter().map(|q| q.id).collect();
        assert_eq!(side, vec![2, 3]);
        assert_eq!(catalog.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_load_from_directory() {
        let temp_dir = TempDir::new().unwrap();
        let quest_dir = temp_dir.path().join("quests").join("chapter1");
        std::fs::create_dir_all(&quest_dir).unwrap();

        std::fs::write(
            quest_dir.join("awakening.toml"),
            r#"
[quest]
id = 1
name = "Awakening"
type = "main"
auto_accept = true

[[quest.objectives]]
id = 1
type = "talk_to_npc"
target = 1
"#,
        )
        .unwrap();

        // Skipped: unknown objective type
        std::fs::write(
            quest_dir.join("broken.toml"),
            r#"
[quest]
id = 5
name = "Broken"

[[quest.objectives]]
id = 1
type = "juggle"
"#,
        )
        .unwrap();

        let catalog = QuestCatalog::load_from_directory(temp_dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);

        let quest = catalog.get_quest(1).unwrap();
        assert_eq!(quest.name, "Awakening");
        assert!(quest.auto_accept);
    }

    #[test]
    fn test_duplicate_across_files_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let quest_dir = temp_dir.path().join("quests");
        std::fs::create_dir_all(&quest_dir).unwrap();

        let body = r#"
[quest]
id = 4
name = "Twin"

[[quest.objectives]]
id = 1
type = "explore"
"#;
        std::fs::write(quest_dir.join("a.toml"), body).unwrap();
        std::fs::write(quest_dir.join("b.toml"), body).unwrap();

        let result = QuestCatalog::load_from_directory(temp_dir.path());
        assert!(matches!(result, Err(CatalogError::DuplicateQuest(4))));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = QuestCatalog::load_from_directory(temp_dir.path()).unwrap();
        assert!(catalog.is_empty());
    }
}
