//! Testing utilities for the planboard workspace
//!
//! Shared stores, sinks, policies and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use planboard_core::{ItemTypeId, WidgetInstance, WidgetSize};
use planboard_engine::{
    AccessPolicy, EngineResult, EntityKey, Planboard, PlanboardConfig, SaveSink,
};
use planboard_storage::{KeyValueStore, MemoryStore, StorageError, StorageResult};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Debounce delay used by [`test_board`]
pub const TEST_DELAY: Duration = Duration::from_millis(100);

/// Memory store whose writes can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `set`/`remove` fail with `AccessDenied`
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful writes so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Put raw text under a physical key, bypassing the failure switch
    pub fn inject(&self, key: &str, raw: &str) {
        self.inner.set(key, raw).unwrap();
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner.get(key).unwrap()
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::AccessDenied("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check()?;
        self.inner.set(key, value)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check()?;
        self.inner.remove(key)
    }
}

/// Sink that records every save
#[derive(Debug, Default)]
pub struct RecordingSink {
    saves: Mutex<Vec<(EntityKey, Value)>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn saves(&self) -> Vec<(EntityKey, Value)> {
        self.saves.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.saves.lock().len()
    }

    pub fn last_for(&self, key: &EntityKey) -> Option<Value> {
        self.saves
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl SaveSink for RecordingSink {
    async fn save(&self, key: &EntityKey, draft: &Value) -> EngineResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                requested: draft.to_string().len(),
                limit: 0,
            }
            .into());
        }
        self.saves.lock().push((key.clone(), draft.clone()));
        Ok(())
    }
}

/// Policy granting every capability
pub fn allow_all() -> Arc<dyn AccessPolicy> {
    Arc::new(|_: &str| true)
}

/// Policy denying every capability
pub fn deny_all() -> Arc<dyn AccessPolicy> {
    Arc::new(|_: &str| false)
}

/// Test configuration with a short debounce delay
pub fn test_config() -> PlanboardConfig {
    PlanboardConfig::new().with_autosave_delay(TEST_DELAY)
}

/// Planboard over `store` with every capability granted
pub fn test_board(store: Arc<dyn KeyValueStore>) -> Planboard {
    Planboard::new(store, allow_all(), test_config())
}

/// Unbound widget with a fixed id
pub fn widget(id: &str, widget_type: ItemTypeId) -> WidgetInstance {
    WidgetInstance::new(widget_type, WidgetSize::Medium).with_id(id)
}
