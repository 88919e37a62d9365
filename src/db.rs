//! Save-slot stores for quest state.
//!
//! Both stores keep one JSON-encoded [`SerializableState`] per slot. Loads go
//! through the lenient decoder, so a damaged save yields empty collections
//! rather than an error; only genuine I/O failures are reported.

use std::io::Write;
use std::path::{Path, PathBuf};

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{SaveBackend, SaveConfig};
use crate::error::StoreError;
use crate::quest::SerializableState;

/// Slot names end up in file names, so keep them plain
fn validate_slot(slot: &str) -> Result<(), StoreError> {
    let valid = !slot.is_empty()
        && slot.len() <= 64
        && slot.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSlot(slot.to_string()))
    }
}

pub struct SqliteSaveStore {
    pool: SqlitePool,
}

impl SqliteSaveStore {
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        // Every connection to an in-memory database is a separate database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Self::migrate(&pool).await?;

        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS quest_saves (
                slot TEXT PRIMARY KEY NOT NULL,
                state_json TEXT NOT NULL DEFAULT '{}',
                saved_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(pool)
        .await?;

        info!("Database migrations complete");
        Ok(())
    }

    pub async fn load(&self, slot: &str) -> Result<Option<SerializableState>, StoreError> {
        validate_slot(slot)?;

        let row = sqlx::query("SELECT state_json FROM quest_saves WHERE slot = ?")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            let json: String = r.get("state_json");
            SerializableState::from_json(&json)
        }))
    }

    pub async fn save(&self, slot: &str, state: &SerializableState) -> Result<(), StoreError> {
        validate_slot(slot)?;
        let json = state.to_json()?;

        sqlx::query(
            r#"INSERT INTO quest_saves (slot, state_json, saved_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(slot) DO UPDATE SET
                state_json = excluded.state_json,
                saved_at = CURRENT_TIMESTAMP"#,
        )
        .bind(slot)
        .bind(&json)
        .execute(&self.pool)
        .await?;

        debug!("Saved quest state to slot '{}' ({} bytes)", slot, json.len());
        Ok(())
    }

    pub async fn delete(&self, slot: &str) -> Result<bool, StoreError> {
        validate_slot(slot)?;
        let result = sqlx::query("DELETE FROM quest_saves WHERE slot = ?")
            .bind(slot)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// One `<slot>.json` file per slot
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::File {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn slot_path(&self, slot: &str) -> Result<PathBuf, StoreError> {
        validate_slot(slot)?;
        Ok(self.dir.join(format!("{slot}.json")))
    }

    pub fn load(&self, slot: &str) -> Result<Option<SerializableState>, StoreError> {
        let path = self.slot_path(slot)?;
        match std::fs::read_to_string(&path) {
            Ok(json) => Ok(Some(SerializableState::from_json(&json))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::File { path, source }),
        }
    }

    /// Write to a temp file beside the target, then move it over the target
    pub fn save(&self, slot: &str, state: &SerializableState) -> Result<(), StoreError> {
        let path = self.slot_path(slot)?;
        let json = state.to_json()?;
        let file_err = |source| StoreError::File {
            path: path.clone(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(file_err)?;
        temp.write_all(json.as_bytes()).map_err(file_err)?;
        temp.as_file().sync_all().map_err(file_err)?;
        temp.persist(&path).map_err(|e| file_err(e.error))?;

        debug!("Saved quest state to {:?} ({} bytes)", path, json.len());
        Ok(())
    }

    pub fn delete(&self, slot: &str) -> Result<bool, StoreError> {
        let path = self.slot_path(slot)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::File { path, source }),
        }
    }
}

/// The configured save backend
pub enum SaveStore {
    Sqlite(SqliteSaveStore),
    File(JsonFileStore),
}

impl SaveStore {
    pub async fn open(config: &SaveConfig) -> Result<Self, StoreError> {
        match config.backend {
            SaveBackend::Sqlite => Ok(SaveStore::Sqlite(SqliteSaveStore::new(&config.database_url).await?)),
            SaveBackend::File => Ok(SaveStore::File(JsonFileStore::new(&config.save_dir)?)),
        }
    }

    pub async fn load(&self, slot: &str) -> Result<Option<SerializableState>, StoreError> {
        match self {
            SaveStore::Sqlite(store) => store.load(slot).await,
            SaveStore::File(store) => store.load(slot),
        }
    }

    pub async fn save(&self, slot: &str, state: &SerializableState) -> Result<(), StoreError> {
        match self {
            SaveStore::Sqlite(store) => store.save(slot, state).await,
            SaveStore::File(store) => store.save(slot, state),
        }
    }

    pub async fn delete(&self, slot: &str) -> Result<bool, StoreError> {
        match self {
            SaveStore::Sqlite(store) => store.delete(slot).await,
            SaveStore::File(store) => store.delete(slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::{
        ActiveQuest, Objective, ObjectiveType, QuestDefinition, QuestKind, QuestStateStore,
    };
    use tempfile::TempDir;

    fn sample_state() -> SerializableState {
        let definition = QuestDefinition::new(1, "Awakening", QuestKind::Main)
            .with_objective(Objective::new(1, ObjectiveType::TalkToNpc).with_target(1));
        let mut store = QuestStateStore::new();
        store.insert_active(ActiveQuest::accept(&definition));
        store.turned_in_quests.insert(7);
        store.completed_quests.insert(7);
        SerializableState::export(&store)
    }

    #[tokio::test]
    async fn test_sqlite_save_and_load() {
        let store = SqliteSaveStore::new("sqlite::memory:").await.unwrap();
        assert!(store.load("default").await.unwrap().is_none());

        let state = sample_state();
        store.save("default", &state).await.unwrap();
        assert_eq!(store.load("default").await.unwrap(), Some(state.clone()));

        // Upsert replaces the previous save
        store.save("default", &SerializableState::default()).await.unwrap();
        assert_eq!(store.load("default").await.unwrap(), Some(SerializableState::default()));

        assert!(store.delete("default").await.unwrap());
        assert!(!store.delete("default").await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_corrupt_row_loads_empty() {
        let store = SqliteSaveStore::new("sqlite::memory:").await.unwrap();
        sqlx::query("INSERT INTO quest_saves (slot, state_json) VALUES ('broken', '{not json')")
            .execute(&store.pool)
            .await
            .unwrap();

        assert_eq!(store.load("broken").await.unwrap(), Some(SerializableState::default()));
    }

    #[test]
    fn test_file_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(&temp_dir.path().join("saves")).unwrap();

        assert!(store.load("hero").unwrap().is_none());

        let state = sample_state();
        store.save("hero", &state).unwrap();
        assert_eq!(store.load("hero").unwrap(), Some(state));
        assert!(temp_dir.path().join("saves").join("hero.json").exists());

        assert!(store.delete("hero").unwrap());
        assert!(store.load("hero").unwrap().is_none());
    }

    #[test]
    fn test_slot_names_are_checked() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp_dir.path()).unwrap();

        assert!(matches!(
            store.save("../escape", &SerializableState::default()),
            Err(StoreError::InvalidSlot(_))
        ));
        assert!(matches!(store.load(""), Err(StoreError::InvalidSlot(_))));
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = SaveConfig {
            backend: SaveBackend::File,
            save_dir: temp_dir.path().to_path_buf(),
            ..SaveConfig::default()
        };

        let state = sample_state();
        let store = SaveStore::open(&config).await.unwrap();
        store.save(&config.slot, &state).await.unwrap();
        assert_eq!(store.load(&config.slot).await.unwrap(), Some(state));
    }
}
