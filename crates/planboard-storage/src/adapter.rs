//! Key-value store adapter
//!
//! Provides the [`KeyValueStore`] trait over a synchronous, string-keyed
//! medium, plus [`MemoryStore`], an in-process implementation with an
//! optional byte quota.

use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;

/// Synchronous string-keyed storage medium
///
/// Implementations surface their failure modes as [`StorageError`];
/// callers that prefer best-effort reads use [`KeyValueStore::get_lossy`].
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read the value stored under `key`
    ///
    /// # Errors
    /// Returns error if the medium cannot be read
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    /// - `StorageError::QuotaExceeded` if the medium is full
    /// - `StorageError::AccessDenied` / `StorageError::Io` on medium failure
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`; removing an absent key is not an error
    ///
    /// # Errors
    /// Returns error if the medium cannot be written
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Read-modify-write a single key
    ///
    /// The mutator receives the current value and returns the new one;
    /// returning `None` removes the key.
    ///
    /// # Errors
    /// Propagates read or write failures
    fn update(
        &self,
        key: &str,
        mutator: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> StorageResult<()> {
        let current = self.get(key)?;
        match mutator(current) {
            Some(next) => self.set(key, &next),
            None => self.remove(key),
        }
    }

    /// Read `key`, treating any medium failure as absence
    fn get_lossy(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "store read failed, treating key as absent");
                None
            }
        }
    }
}

/// In-memory key-value store
///
/// Byte accounting counts key and value lengths, mirroring how browser
/// storage quotas are measured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Create unbounded store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store that rejects writes beyond `quota_bytes`
    #[inline]
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Current number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Bytes currently held (keys plus values)
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();

        if let Some(limit) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = others + key.len() + value.len();
            if requested > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    requested,
                    limit,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
