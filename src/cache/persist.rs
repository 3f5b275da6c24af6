//! Persisted Tier Module
//!
//! The persisted tier is a single serialized map stored under one well-known
//! key of an injected [`PersistedStore`]. Every write re-serializes the whole
//! map. Failures never leave this module: reads fail open to an empty map and
//! writes degrade to no-ops, both with a warning.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::CacheEntry;
use crate::error::{CacheError, Result};

/// Default storage key the persisted map lives under.
pub const DEFAULT_STORAGE_KEY: &str = "app_cache";

// == Persisted Store Trait ==
/// Host key/value storage backing the persisted tier.
///
/// Operations are synchronous; implementations are expected to be small
/// local stores (a directory of files, an in-process map).
pub trait PersistedStore: Send + Sync + Debug {
    /// Reads the document stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the document stored under `key`.
    fn save(&self, key: &str, data: &str) -> Result<()>;

    /// Deletes the document stored under `key`. Absent keys are not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Lists every storage key currently present.
    fn list_keys(&self) -> Result<Vec<String>>;
}

// == Memory Storage ==
/// In-process [`PersistedStore`], with a switch to simulate an unavailable host.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Persistence("storage unavailable".to_string()));
        }
        Ok(())
    }
}

impl PersistedStore for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.documents.lock().get(key).cloned())
    }

    fn save(&self, key: &str, data: &str) -> Result<()> {
        self.check_available()?;
        self.documents.lock().insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.documents.lock().remove(key);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self.documents.lock().keys().cloned().collect())
    }
}

// == File Storage ==
/// [`PersistedStore`] keeping one `<key>.json` file per storage key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) a storage directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CacheError::Persistence(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid || key.starts_with('.') {
            return Err(CacheError::Persistence(format!(
                "invalid storage key: {key}"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl PersistedStore for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::Persistence(format!(
                "read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn save(&self, key: &str, data: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| CacheError::Persistence(format!("write {}: {}", path.display(), e)))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Persistence(format!(
                "delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn list_keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            CacheError::Persistence(format!("list {}: {}", self.dir.display(), e))
        })?;

        Ok(entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .collect())
    }
}

// == Persisted Tier ==
/// The persisted map, read and rewritten as one document.
#[derive(Debug, Clone)]
pub struct PersistedTier {
    storage: Option<Arc<dyn PersistedStore>>,
    storage_key: String,
}

impl PersistedTier {
    /// A tier with no backing storage; reads miss and writes are dropped.
    pub fn disabled() -> Self {
        Self {
            storage: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }

    pub fn new(storage: Arc<dyn PersistedStore>, storage_key: impl Into<String>) -> Self {
        Self {
            storage: Some(storage),
            storage_key: storage_key.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    // == Read ==
    /// Loads the whole persisted map.
    ///
    /// Missing, unreadable or corrupt documents read as an empty map.
    pub fn read_map(&self) -> HashMap<String, CacheEntry> {
        let Some(storage) = &self.storage else {
            return HashMap::new();
        };

        let raw = match storage.load(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(e) => {
                warn!("Persisted tier read failed: {}", e);
                return HashMap::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!("Persisted tier is corrupt, treating as empty: {}", e);
                HashMap::new()
            }
        }
    }

    // == Write ==
    /// Replaces the persisted map with `map`.
    pub fn write_map(&self, map: &HashMap<String, CacheEntry>) {
        let Some(storage) = &self.storage else {
            return;
        };

        let encoded = match serde_json::to_string(map) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Persisted tier serialization failed: {}", e);
                return;
            }
        };

        match storage.save(&self.storage_key, &encoded) {
            Ok(()) => debug!("Persisted tier rewritten with {} entries", map.len()),
            Err(e) => warn!("Persisted tier write failed: {}", e),
        }
    }

    /// Drops the whole persisted document.
    pub fn clear(&self) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.delete(&self.storage_key) {
                warn!("Persisted tier clear failed: {}", e);
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn sample_map() -> HashMap<String, CacheEntry> {
        let mut map = HashMap::new();
        map.insert(
            "favorite-lands".to_string(),
            CacheEntry::new(json!([1, 2]), Duration::ZERO, true, 10),
        );
        map
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "listing_cache_{}_{}_{}",
            name,
            std::process::id(),
            crate::cache::current_timestamp_ms()
        ))
    }

    #[test]
    fn test_tier_round_trips_through_memory_storage() {
        let tier = PersistedTier::new(Arc::new(MemoryStorage::new()), DEFAULT_STORAGE_KEY);

        tier.write_map(&sample_map());

        assert_eq!(tier.read_map(), sample_map());
    }

    #[test]
    fn test_corrupt_document_reads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save(DEFAULT_STORAGE_KEY, "{not json").unwrap();
        let tier = PersistedTier::new(storage, DEFAULT_STORAGE_KEY);

        assert!(tier.read_map().is_empty());
    }

    #[test]
    fn test_unavailable_storage_degrades_silently() {
        let storage = Arc::new(MemoryStorage::new());
        let tier = PersistedTier::new(storage.clone(), DEFAULT_STORAGE_KEY);
        storage.set_unavailable(true);

        tier.write_map(&sample_map());
        assert!(tier.read_map().is_empty());
        tier.clear();

        storage.set_unavailable(false);
        assert!(storage.load(DEFAULT_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_disabled_tier_is_inert() {
        let tier = PersistedTier::disabled();

        tier.write_map(&sample_map());

        assert!(!tier.is_enabled());
        assert!(tier.read_map().is_empty());
    }

    #[test]
    fn test_file_storage_lifecycle() {
        let dir = scratch_dir("file_storage");
        let storage = FileStorage::new(&dir).unwrap();

        assert!(storage.load("app_cache").unwrap().is_none());
        storage.save("app_cache", "{}").unwrap();
        assert_eq!(storage.load("app_cache").unwrap().as_deref(), Some("{}"));
        assert_eq!(storage.list_keys().unwrap(), vec!["app_cache".to_string()]);

        storage.delete("app_cache").unwrap();
        storage.delete("app_cache").unwrap();
        assert!(storage.list_keys().unwrap().is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = scratch_dir("file_storage_keys");
        let storage = FileStorage::new(&dir).unwrap();

        assert!(storage.save("../escape", "{}").is_err());
        assert!(storage.load("").is_err());

        fs::remove_dir_all(&dir).unwrap();
    }
}
