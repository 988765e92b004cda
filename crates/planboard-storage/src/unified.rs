//! Collection storage with a read-through cache
//!
//! Provides [`UnifiedStorage`], which stores each logical collection as a
//! JSON array under its own key and keeps the parsed arrays in memory.
//!
//! # Cache policy
//! - Read-through: the first read of a collection goes to the store
//! - Write-through: every mutation writes the store, then refreshes the cache
//! - No TTL, no eviction (one entry per collection)
//!
//! Each mutation holds the cache lock for the whole
//! read → compute → write → refresh sequence.
//!
//! Reads are lossy: an unreadable store or corrupt data yields an empty
//! collection. Mutations are not: a failed store read aborts them, so a
//! write never replaces data that could not be read.

use crate::adapter::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default prefix prepended to collection names to form store keys
pub const DEFAULT_KEY_PREFIX: &str = "planboard:";

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Collections currently cached
    pub collections: usize,
    /// Reads answered from memory
    pub hits: u64,
    /// Reads that went to the store
    pub misses: u64,
}

/// Cached, collection-oriented view over a [`KeyValueStore`]
#[derive(Debug)]
pub struct UnifiedStorage {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
    cache: Mutex<HashMap<String, Vec<Value>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UnifiedStorage {
    /// Create storage using [`DEFAULT_KEY_PREFIX`]
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_prefix(store, DEFAULT_KEY_PREFIX)
    }

    /// Create storage with a custom key prefix
    #[must_use]
    pub fn with_prefix(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
            cache: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Physical store key for a collection
    #[inline]
    #[must_use]
    pub fn storage_key(&self, collection: &str) -> String {
        format!("{}{}", self.key_prefix, collection)
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Read a collection
    ///
    /// Absent or unparsable data yields an empty list. Elements that do not
    /// match `T` are dropped one by one. Corruption is logged, never returned
    /// as an error.
    #[must_use]
    pub fn get_collection<T: DeserializeOwned>(&self, collection: &str) -> Vec<T> {
        let raw = {
            let mut cache = self.cache.lock();
            self.load_lossy(&mut cache, collection)
        };
        decode(collection, raw)
    }

    /// Find an element of a collection by its `id` field
    #[must_use]
    pub fn find_item<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Option<T> {
        let raw = {
            let mut cache = self.cache.lock();
            self.load_lossy(&mut cache, collection)
        };
        let value = raw.into_iter().find(|v| has_id(v, id))?;
        match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::warn!(collection, id, error = %err, "stored item has unexpected shape");
                None
            }
        }
    }

    /// Replace a collection
    ///
    /// # Errors
    /// Returns error if serialization or the store write fails; the cache is
    /// left untouched in that case.
    pub fn save_collection<T: Serialize>(&self, collection: &str, items: &[T]) -> StorageResult<()> {
        let values = encode(collection, items)?;
        let mut cache = self.cache.lock();
        self.write(&mut cache, collection, values)
    }

    /// Append one element
    ///
    /// # Errors
    /// Returns error if serialization or the store write fails
    pub fn add_item<T: Serialize>(&self, collection: &str, item: &T) -> StorageResult<()> {
        let value = serde_json::to_value(item)
            .map_err(|e| StorageError::serialization(collection, e))?;
        let mut cache = self.cache.lock();
        let mut values = self.load(&mut cache, collection)?;
        values.push(value);
        self.write(&mut cache, collection, values)
    }

    /// Replace the element with `id`, or append it when absent
    ///
    /// # Errors
    /// Returns error if serialization or the store write fails
    pub fn upsert_item<T: Serialize>(&self, collection: &str, id: &str, item: &T) -> StorageResult<()> {
        let value = serde_json::to_value(item)
            .map_err(|e| StorageError::serialization(collection, e))?;
        let mut cache = self.cache.lock();
        let mut values = self.load(&mut cache, collection)?;
        match values.iter_mut().find(|v| has_id(v, id)) {
            Some(slot) => *slot = value,
            None => values.push(value),
        }
        self.write(&mut cache, collection, values)
    }

    /// Shallow-merge `partial` into the element with `id`
    ///
    /// Top-level keys of `partial` overwrite those of the stored element.
    ///
    /// # Returns
    /// `Ok(false)` without writing when no element has that id or `partial`
    /// is not a JSON object
    ///
    /// # Errors
    /// Returns error if the store write fails
    pub fn update_item(&self, collection: &str, id: &str, partial: &Value) -> StorageResult<bool> {
        let Some(patch) = partial.as_object() else {
            tracing::warn!(collection, id, "ignoring non-object partial update");
            return Ok(false);
        };

        let mut cache = self.cache.lock();
        let mut values = self.load(&mut cache, collection)?;
        let Some(Value::Object(target)) = values.iter_mut().find(|v| has_id(v, id)) else {
            return Ok(false);
        };
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
        self.write(&mut cache, collection, values)?;
        Ok(true)
    }

    /// Remove the element with `id`
    ///
    /// # Returns
    /// `Ok(false)` without writing when no element has that id
    ///
    /// # Errors
    /// Returns error if the store write fails
    pub fn delete_item(&self, collection: &str, id: &str) -> StorageResult<bool> {
        let mut cache = self.cache.lock();
        let values = self.load(&mut cache, collection)?;
        let before = values.len();
        let kept: Vec<Value> = values.into_iter().filter(|v| !has_id(v, id)).collect();
        if kept.len() == before {
            return Ok(false);
        }
        self.write(&mut cache, collection, kept)?;
        Ok(true)
    }

    /// Typed read-modify-write of a whole collection
    ///
    /// The store is written only when `f` actually changed the decoded
    /// collection. Stored elements that do not match `T` survive a no-op and
    /// are dropped by the first real change.
    ///
    /// # Errors
    /// Returns error if the store read, serialization or the store write fails
    pub fn modify_collection<T, R, F>(&self, collection: &str, f: F) -> StorageResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let mut cache = self.cache.lock();
        let stored = self.load(&mut cache, collection)?;
        let mut items: Vec<T> = decode(collection, stored);
        let before = encode(collection, &items)?;

        let result = f(&mut items);

        let after = encode(collection, &items)?;
        if after != before {
            self.write(&mut cache, collection, after)?;
        }
        Ok(result)
    }

    /// Delete a collection from the store and the cache
    ///
    /// # Errors
    /// Returns error if the store removal fails
    pub fn remove_collection(&self, collection: &str) -> StorageResult<()> {
        let mut cache = self.cache.lock();
        self.store.remove(&self.storage_key(collection))?;
        cache.remove(collection);
        Ok(())
    }

    /// Drop every cached collection, forcing the next reads to the store
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        tracing::debug!(collections = cache.len(), "clearing collection cache");
        cache.clear();
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            collections: self.cache.lock().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn load(&self, cache: &mut HashMap<String, Vec<Value>>, collection: &str) -> StorageResult<Vec<Value>> {
        if let Some(hit) = cache.get(collection) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let Some(raw) = self.store.get(&self.storage_key(collection))? else {
            cache.insert(collection.to_string(), Vec::new());
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => {
                tracing::debug!(collection, len = values.len(), "loaded collection from store");
                cache.insert(collection.to_string(), values.clone());
                Ok(values)
            }
            Err(err) => {
                tracing::warn!(collection, error = %err, "stored collection is corrupt, using empty collection");
                Ok(Vec::new())
            }
        }
    }

    fn load_lossy(&self, cache: &mut HashMap<String, Vec<Value>>, collection: &str) -> Vec<Value> {
        self.load(cache, collection).unwrap_or_else(|err| {
            tracing::warn!(collection, error = %err, "collection read failed, using empty collection");
            Vec::new()
        })
    }

    fn write(
        &self,
        cache: &mut HashMap<String, Vec<Value>>,
        collection: &str,
        values: Vec<Value>,
    ) -> StorageResult<()> {
        let body = serde_json::to_string(&values)
            .map_err(|e| StorageError::serialization(collection, e))?;
        self.store.set(&self.storage_key(collection), &body)?;
        cache.insert(collection.to_string(), values);
        Ok(())
    }
}

fn has_id(value: &Value, id: &str) -> bool {
    value.get("id").and_then(Value::as_str) == Some(id)
}

fn decode<T: DeserializeOwned>(collection: &str, values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").and_then(Value::as_str).map(str::to_string);
            match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(err) => {
                    tracing::warn!(collection, id = ?id, error = %err, "skipping element with unexpected shape");
                    None
                }
            }
        })
        .collect()
}

fn encode<T: Serialize>(collection: &str, items: &[T]) -> StorageResult<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(|e| StorageError::serialization(collection, e)))
        .collect()
}
