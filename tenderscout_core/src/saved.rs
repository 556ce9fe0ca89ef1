//! Saved-search persistence.
//!
//! A caller-side convenience, not part of the engine: a stored search is
//! just a named `SearchQuery` plus a notify flag, replayed later through
//! the aggregation facade. The engine itself never reads this store.

use crate::model::SearchQuery;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// A stored search with its bookkeeping metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSearch {
    pub id: Uuid,
    pub name: String,
    pub query: SearchQuery,

    /// Whether the caller wants notifications for new results. Delivery
    /// belongs to the surrounding application.
    #[serde(default)]
    pub notify: bool,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

/// Errors from saved-search storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SavedSearchError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("saved search not found: {0}")]
    NotFound(String),
}

/// JSON-file store at `~/.config/tenderscout/saved_searches.json`.
pub struct SavedSearchStore {
    path: PathBuf,
}

impl SavedSearchStore {
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        let path = base.join("tenderscout").join("saved_searches.json");
        Self { path }
    }

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Store a query under a name; returns the new entry's id.
    pub fn save(
        &self,
        name: impl Into<String>,
        query: SearchQuery,
        notify: bool,
    ) -> Result<Uuid, SavedSearchError> {
        let entry = SavedSearch {
            id: Uuid::new_v4(),
            name: name.into(),
            query,
            notify,
            created_at: Utc::now(),
            last_used: None,
        };

        let mut entries = self.load_all();
        let id = entry.id;
        entries.insert(id, entry);
        self.write_all(&entries)?;
        Ok(id)
    }

    /// All saved searches, most recently created first.
    pub fn list(&self) -> Vec<SavedSearch> {
        let mut entries: Vec<SavedSearch> = self.load_all().into_values().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    /// Find by id, or by name when the argument is not a uuid.
    pub fn find(&self, key: &str) -> Option<SavedSearch> {
        let entries = self.load_all();
        if let Ok(id) = Uuid::parse_str(key) {
            return entries.get(&id).cloned();
        }
        entries.into_values().find(|e| e.name == key)
    }

    /// Record that a saved search was replayed.
    pub fn touch(&self, id: Uuid) -> Result<(), SavedSearchError> {
        let mut entries = self.load_all();
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| SavedSearchError::NotFound(id.to_string()))?;
        entry.last_used = Some(Utc::now());
        self.write_all(&entries)
    }

    /// Returns `Ok(true)` if deleted, `Ok(false)` if not found.
    pub fn delete(&self, id: Uuid) -> Result<bool, SavedSearchError> {
        let mut entries = self.load_all();
        let existed = entries.remove(&id).is_some();
        if existed {
            self.write_all(&entries)?;
        }
        Ok(existed)
    }

    fn load_all(&self) -> HashMap<Uuid, SavedSearch> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    fn write_all(&self, entries: &HashMap<Uuid, SavedSearch>) -> Result<(), SavedSearchError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SavedSearchError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| SavedSearchError::Serialize(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| SavedSearchError::Io(e.to_string()))?;

        Ok(())
    }
}

impl Default for SavedSearchStore {
    fn default() -> Self {
        Self::new_default()
    }
}
