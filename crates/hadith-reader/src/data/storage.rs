//! Durable key-value storage
//!
//! Both registries persist their whole state as one JSON value under a
//! stable key. The store itself is injected, so the file-backed store used
//! by the application can be swapped for the in-memory one in tests.

use crate::config::app::NAME;
use crate::config::storage::{FILE_EXTENSION, STATE_VERSION};
use crate::error::{Result, StoreError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Whole-value key-value store
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` if absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value stored under `key`
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the value stored under `key` (absent keys are fine)
    fn remove(&self, key: &str) -> Result<()>;
}

/// Get the application data directory path
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(NAME))
        .ok_or_else(|| StoreError::Config(
            "Could not determine data directory. HOME environment variable may not be set.".to_string()
        ))
}

// =============================================================================
// FileStore - one JSON file per key
// =============================================================================

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create a store in the default data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(data_dir()?))
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, FILE_EXTENSION))
    }

    fn checked_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::Config(format!("Invalid storage key '{}'", key)));
        }
        Ok(self.path_for(key))
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.checked_path(key)?;
        read_file(key, &path)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.checked_path(key)?;
        create_dir_if_needed(key, &self.dir)?;
        write_file(key, &path, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.checked_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::PersistenceWrite {
                key: key.to_string(),
                message: format!("Failed to delete {:?}: {}", path, e),
            }),
        }
    }
}

/// Create a directory if it doesn't exist, with proper error handling
fn create_dir_if_needed(key: &str, path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        let message = match e.kind() {
            ErrorKind::PermissionDenied => {
                format!("Permission denied: cannot create directory {:?}", path)
            }
            _ => format!("Failed to create directory {:?}: {}", path, e),
        };
        StoreError::PersistenceWrite { key: key.to_string(), message }
    })
}

/// Read file contents; a missing file is `None`
fn read_file(key: &str, path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => {
            let message = match e.kind() {
                ErrorKind::PermissionDenied => format!("Permission denied: cannot read {:?}", path),
                _ => format!("Failed to read {:?}: {}", path, e),
            };
            Err(StoreError::PersistenceRead { key: key.to_string(), message })
        }
    }
}

/// Write file contents through a sibling temp file
///
/// The temp file is renamed over `path`, so an interrupted write leaves the
/// previous value in place.
fn write_file(key: &str, path: &Path, content: &str) -> Result<()> {
    let tmp = temp_path(path);
    fs::write(&tmp, content).map_err(|e| write_error(key, &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        write_error(key, path, e)
    })
}

/// `<key>.json` -> `<key>.json.tmp`
fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!("{}.tmp", FILE_EXTENSION))
}

fn write_error(key: &str, path: &Path, e: std::io::Error) -> StoreError {
    let message = match e.kind() {
        ErrorKind::PermissionDenied => {
            format!("Permission denied: cannot write to {:?}", path)
        }
        ErrorKind::ReadOnlyFilesystem => {
            format!("Cannot write to {:?}: filesystem is read-only", path)
        }
        _ => format!("Failed to write to {:?}: {}", path, e),
    };
    StoreError::PersistenceWrite { key: key.to_string(), message }
}

// =============================================================================
// MemoryStore - process-local map
// =============================================================================

/// In-memory store, survives as long as the value itself
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// Persisted envelope
// =============================================================================

/// On-disk wrapper: `{"state": ..., "version": 0}`
#[derive(Debug, Serialize, Deserialize)]
pub struct Persisted<T> {
    pub state: T,
    #[serde(default)]
    pub version: u32,
}

/// Read and decode the state stored under `key`
///
/// Returns `None` if the key is absent or holds only whitespace.
/// Returns an error if the value can't be read or parsed.
pub fn load_state<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let content = match store.read(key)? {
        Some(c) => c,
        None => return Ok(None),
    };

    // Empty value is treated as non-existent
    if content.trim().is_empty() {
        return Ok(None);
    }

    let persisted: Persisted<T> = serde_json::from_str(&content).map_err(|e| {
        StoreError::Malformed { key: key.to_string(), message: e.to_string() }
    })?;

    Ok(Some(persisted.state))
}

/// Encode `state` into the persisted envelope
pub fn encode_state<T: Serialize>(state: &T) -> Result<String> {
    let persisted = Persisted { state, version: STATE_VERSION };
    Ok(serde_json::to_string_pretty(&persisted)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_store(name: &str) -> FileStore {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        FileStore::new(temp_dir().join(format!("hadith_reader_storage_{}_{}", id, name)))
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        value: i32,
    }

    #[test]
    fn test_file_store_write_and_read() {
        let store = temp_store("write_read");

        store.write("key", "hello").unwrap();
        assert_eq!(store.read("key").unwrap(), Some("hello".to_string()));

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_missing_key() {
        let store = temp_store("missing");
        assert_eq!(store.read("nothing").unwrap(), None);
    }

    #[test]
    fn test_file_store_creates_dir() {
        let store = temp_store("nested");
        assert!(!store.dir().exists());

        store.write("settings-storage", "{}").unwrap();
        assert!(store.path_for("settings-storage").exists());

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_overwrites_whole_value() {
        let store = temp_store("overwrite");

        store.write("key", "a much longer first value").unwrap();
        store.write("key", "short").unwrap();
        assert_eq!(store.read("key").unwrap(), Some("short".to_string()));

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_write_leaves_no_temp_file() {
        let store = temp_store("no_temp");

        store.write("favorites-storage", "first").unwrap();
        store.write("favorites-storage", "second").unwrap();

        let names: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["favorites-storage.json".to_string()]);

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_interrupted_write_keeps_previous_value() {
        let store = temp_store("interrupted");
        store.write("favorites-storage", "complete value").unwrap();

        // A crash between the temp write and the rename leaves only the temp file behind
        let path = store.path_for("favorites-storage");
        fs::write(temp_path(&path), "compl").unwrap();

        assert_eq!(store.read("favorites-storage").unwrap(), Some("complete value".to_string()));

        // The next write replaces the leftover
        store.write("favorites-storage", "newer").unwrap();
        assert_eq!(store.read("favorites-storage").unwrap(), Some("newer".to_string()));
        assert!(!temp_path(&path).exists());

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_remove() {
        let store = temp_store("remove");

        store.write("key", "value").unwrap();
        store.remove("key").unwrap();
        assert_eq!(store.read("key").unwrap(), None);

        // Removing again is fine
        store.remove("key").unwrap();

        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let store = temp_store("bad_key");
        assert!(store.write("../escape", "x").is_err());
        assert!(store.read("a/b").is_err());
        assert!(store.write("", "x").is_err());
    }

    #[test]
    fn test_write_error_names_key() {
        let store = temp_store("readonly_parent");
        // A regular file where the directory should be
        fs::write(store.dir(), "not a directory").unwrap();

        let err = store.write("favorites-storage", "[]").unwrap_err();
        assert!(matches!(err, StoreError::PersistenceWrite { .. }));
        assert!(err.to_string().contains("favorites-storage"));

        let _ = fs::remove_file(store.dir());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.write("a", "1").unwrap();
        store.write("b", "2").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.read("a").unwrap(), Some("1".to_string()));

        store.remove("a").unwrap();
        assert_eq!(store.read("a").unwrap(), None);
    }

    #[test]
    fn test_state_envelope_roundtrip() {
        let store = MemoryStore::new();
        let data = TestData { name: "test".to_string(), value: 42 };

        store.write("key", &encode_state(&data).unwrap()).unwrap();

        let raw = store.read("key").unwrap().unwrap();
        assert!(raw.contains("\"state\""));
        assert!(raw.contains("\"version\": 0"));

        let loaded: Option<TestData> = load_state(&store, "key").unwrap();
        assert_eq!(loaded, Some(data));
    }

    #[test]
    fn test_load_state_absent_or_blank() {
        let store = MemoryStore::new();
        let loaded: Option<TestData> = load_state(&store, "key").unwrap();
        assert_eq!(loaded, None);

        store.write("key", "  \n\t ").unwrap();
        let loaded: Option<TestData> = load_state(&store, "key").unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn test_load_state_malformed() {
        let store = MemoryStore::new();
        store.write("key", "not valid json").unwrap();

        let result: Result<Option<TestData>> = load_state(&store, "key");
        match result {
            Err(StoreError::Malformed { key, .. }) => assert_eq!(key, "key"),
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_load_state_missing_version_is_accepted() {
        let store = MemoryStore::new();
        store.write("key", r#"{"state": {"name": "x", "value": 1}}"#).unwrap();

        let loaded: Option<TestData> = load_state(&store, "key").unwrap();
        assert_eq!(loaded, Some(TestData { name: "x".to_string(), value: 1 }));
    }
}
