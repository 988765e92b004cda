//! File-backed key-value store
//!
//! Keeps every key in a single JSON object on disk, the same shape a
//! browser origin's local storage has. Each write replaces the file via
//! a temporary sibling and a rename, so a crash never leaves a torn file.

use crate::adapter::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key-value store persisted to one JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file is an empty store. An unreadable JSON document is
    /// logged and treated as empty; it is only replaced on the next write.
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the file exists but cannot be read
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = Self::load(&path)?;
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file, discarding the in-memory view
    ///
    /// # Errors
    /// Returns `StorageError::Io` if the file cannot be read
    pub fn reload(&self) -> StorageResult<()> {
        let fresh = Self::load(&self.path)?;
        *self.entries.lock() = fresh;
        Ok(())
    }

    fn load(path: &Path) -> StorageResult<BTreeMap<String, String>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::io_error(path, e)),
        };

        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "store file is not valid JSON, starting empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::serialization(self.path.display().to_string(), e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::io_error(parent, e))?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| StorageError::io_error(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StorageError::io_error(&self.path, e))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json")).unwrap();
        assert!(store.get("anything").unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set("planboard:widget-configs", "[]").unwrap();
            store.set("other", "x").unwrap();
            store.remove("other").unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("planboard:widget-configs").unwrap().as_deref(),
            Some("[]")
        );
        assert!(reopened.get("other").unwrap().is_none());
    }

    #[test]
    fn garbage_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = FileStore::open(&path).unwrap();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v").unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn reload_picks_up_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = FileStore::open(&path).unwrap();
        let second = FileStore::open(&path).unwrap();

        second.set("k", "from-second").unwrap();
        assert!(first.get("k").unwrap().is_none());

        first.reload().unwrap();
        assert_eq!(first.get("k").unwrap().as_deref(), Some("from-second"));
    }
}
