//! Local key-value persistence for history and the API credential.
//!
//! The store is injected as a `KeyValueStore` trait object so tests can run
//! against `MemoryStore`. Blobs carry no schema version: a missing or malformed
//! history blob loads as an empty list.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::domain::HistoryEntry;
use crate::history::MAX_HISTORY;

pub const HISTORY_KEY: &str = "research_history";
pub const CREDENTIAL_KEY: &str = "api_key";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("invalid store key: {0}")]
  InvalidKey(String),
  #[error("store I/O failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to serialize value: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("store lock poisoned")]
  Poisoned,
}

/// Synchronous string blobs addressed by a fixed key. Last writer wins.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
  fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store (tests, ephemeral runs).
#[derive(Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.entries.read().map_err(|_| StoreError::Poisoned)?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self.entries.write().map_err(|_| StoreError::Poisoned)?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.entries.write().map_err(|_| StoreError::Poisoned)?.remove(key);
    Ok(())
  }
}

/// One file per key inside `dir`. Writes go to a temp file and are renamed into place.
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
    let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
      return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(self.dir.join(format!("{key}.json")))
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let path = self.path_for(key)?;
    match std::fs::read_to_string(&path) {
      Ok(s) => Ok(Some(s)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let path = self.path_for(key)?;
    std::fs::create_dir_all(&self.dir)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value)?;
    std::fs::rename(&tmp, &path)?;
    debug!(target: "research_backend", key, bytes = value.len(), "Store blob written");
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let path = self.path_for(key)?;
    match std::fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

/// The ordered history list, serialized as one JSON array.
#[derive(Clone)]
pub struct HistoryStore {
  kv: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self { kv }
  }

  /// Never fails: unreadable or malformed blobs load as empty. At most `MAX_HISTORY` entries.
  pub fn load(&self) -> Vec<HistoryEntry> {
    let raw = match self.kv.get(HISTORY_KEY) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Vec::new(),
      Err(e) => {
        warn!(target: "history", error = %e, "Failed to read history; starting empty");
        return Vec::new();
      }
    };
    match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
      Ok(mut list) => {
        if list.len() > MAX_HISTORY {
          warn!(target: "history", entries = list.len(), "Stored history over capacity; keeping the newest");
          list.truncate(MAX_HISTORY);
        }
        list
      }
      Err(e) => {
        warn!(target: "history", error = %e, "Malformed history blob; starting empty");
        Vec::new()
      }
    }
  }

  /// Capacity is the caller's business (see `history::push_capped`).
  pub fn save(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(entries)?;
    self.kv.set(HISTORY_KEY, &raw)
  }
}

/// The single opaque API credential.
#[derive(Clone)]
pub struct CredentialStore {
  kv: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
  pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
    Self { kv }
  }

  pub fn load(&self) -> Option<String> {
    match self.kv.get(CREDENTIAL_KEY) {
      Ok(v) => v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
      Err(e) => {
        warn!(target: "research_backend", error = %e, "Failed to read stored credential");
        None
      }
    }
  }

  pub fn save(&self, credential: &str) -> Result<(), StoreError> {
    self.kv.set(CREDENTIAL_KEY, credential.trim())
  }

  pub fn clear(&self) -> Result<(), StoreError> {
    self.kv.remove(CREDENTIAL_KEY)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{GeneratedDocument, GenerationRequest};

  fn entry(topic: &str) -> HistoryEntry {
    HistoryEntry::from_document(&GeneratedDocument::new(format!("## {topic}"), GenerationRequest::new(topic)))
  }

  #[test]
  fn history_round_trips_through_memory() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = HistoryStore::new(kv);
    assert!(store.load().is_empty());
    let list = vec![entry("b"), entry("a")];
    store.save(&list).unwrap();
    assert_eq!(store.load(), list);
  }

  #[test]
  fn oversized_history_blob_loads_capped() {
    let kv = Arc::new(MemoryStore::new());
    let list: Vec<HistoryEntry> = (0..MAX_HISTORY + 5).map(|n| entry(&format!("t{n}"))).collect();
    kv.set(HISTORY_KEY, &serde_json::to_string(&list).unwrap()).unwrap();

    let loaded = HistoryStore::new(kv).load();
    assert_eq!(loaded.len(), MAX_HISTORY);
    assert_eq!(loaded[0].request.topic, "t0");
    assert_eq!(loaded[MAX_HISTORY - 1].request.topic, format!("t{}", MAX_HISTORY - 1));
  }

  #[test]
  fn malformed_history_loads_empty() {
    let kv = Arc::new(MemoryStore::new());
    kv.set(HISTORY_KEY, "{not json").unwrap();
    assert!(HistoryStore::new(kv.clone()).load().is_empty());
    kv.set(HISTORY_KEY, r#"{"an":"object"}"#).unwrap();
    assert!(HistoryStore::new(kv).load().is_empty());
  }

  #[test]
  fn credential_is_trimmed_and_clearable() {
    let store = CredentialStore::new(Arc::new(MemoryStore::new()));
    assert_eq!(store.load(), None);
    store.save("  sk-abc \n").unwrap();
    assert_eq!(store.load().as_deref(), Some("sk-abc"));
    store.clear().unwrap();
    assert_eq!(store.load(), None);
    store.save("   ").unwrap();
    assert_eq!(store.load(), None);
  }

  #[test]
  fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let first = FileStore::new(dir.path().join("data"));
    assert_eq!(first.get("api_key").unwrap(), None);
    first.set("api_key", "secret").unwrap();

    let second = FileStore::new(dir.path().join("data"));
    assert_eq!(second.get("api_key").unwrap().as_deref(), Some("secret"));
    second.remove("api_key").unwrap();
    second.remove("api_key").unwrap();
    assert_eq!(first.get("api_key").unwrap(), None);
    assert!(!second.dir().join("api_key.json.tmp").exists());
  }

  #[test]
  fn file_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    assert!(matches!(store.set("../escape", "x"), Err(StoreError::InvalidKey(_))));
    assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
  }
}
