//! Credential storage for sources that require one.
//!
//! Credentials are resolved once when the registry is built; adapters
//! hold whatever they need and nothing is consulted at request time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A key/value credential bag for one source (api_key, token, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(flatten)]
    values: HashMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("persist error: {0}")]
    Persist(String),
}

pub trait CredentialStore: Send + Sync {
    fn load(&self, source: &str) -> Option<Credentials>;
    fn save(&self, source: &str, credentials: &Credentials) -> Result<(), StoreError>;
}

/// A simple in-memory store, mainly for testing.
pub struct MemoryCredentialStore {
    map: std::sync::Mutex<HashMap<String, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            map: std::sync::Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, source: &str) -> Option<Credentials> {
        self.map.lock().ok()?.get(source).cloned()
    }
    fn save(&self, source: &str, credentials: &Credentials) -> Result<(), StoreError> {
        self.map
            .lock()
            .map_err(|e| StoreError::Persist(format!("lock poisoned: {}", e)))?
            .insert(source.to_string(), credentials.clone());
        Ok(())
    }
}

/// A file-backed JSON store at `~/.config/tenderscout/credentials.json`
/// (Unix) or `%APPDATA%/tenderscout/credentials.json` (Windows).
pub struct FileCredentialStore {
    path: std::path::PathBuf,
}

impl FileCredentialStore {
    pub fn new_default() -> Self {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let dir = base.join("tenderscout");
        let path = dir.join("credentials.json");
        std::fs::create_dir_all(&dir).ok();
        Self { path }
    }

    pub fn new(path: std::path::PathBuf) -> Self {
        Self { path }
    }

    fn read_map(&self) -> HashMap<String, Credentials> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }

    fn write_map(&self, map: &HashMap<String, Credentials>) -> Result<(), StoreError> {
        let s = serde_json::to_string_pretty(map)
            .map_err(|e| StoreError::Persist(format!("serde: {}", e)))?;
        std::fs::write(&self.path, &s).map_err(|e| StoreError::Persist(e.to_string()))?;

        // Restrictive permissions on Unix (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| StoreError::Persist(format!("chmod: {}", e)))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, source: &str) -> Option<Credentials> {
        let map = self.read_map();
        map.get(source).cloned()
    }

    fn save(&self, source: &str, credentials: &Credentials) -> Result<(), StoreError> {
        let mut map = self.read_map();
        map.insert(source.to_string(), credentials.clone());
        self.write_map(&map)
    }
}
