//! Debounced auto-save
//!
//! Provides [`AutoSaveEngine`], which turns a stream of draft edits into
//! occasional writes:
//! - Edits within the debounce delay collapse into one write of the latest draft
//! - Drafts equal to the last persisted snapshot never schedule a write
//! - `force_save` bypasses the timer
//! - Failed writes keep the draft dirty and surface through the error hook
//!
//! # State machine
//! ```text
//! Idle --update_draft--> PendingTimer --timer--> Saving --> Idle
//! Idle --force_save-----------------------------> Saving --> Idle
//! ```

mod sink;
mod task;

pub use sink::{EntityKey, RegistrySink, SaveSink};
pub use task::{DraftChange, SaveOutcome, TaskState, TaskStatus};

use crate::access::AccessPolicy;
use crate::config::AutoSaveSettings;
use crate::error::{EngineResult, SaveError};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use task::{AutoSaveTask, TaskContext};

/// Callback run after a successful save
pub type SavedHook = Arc<dyn Fn(&EntityKey) + Send + Sync>;

/// Callback run after a failed save
pub type ErrorHook = Arc<dyn Fn(&SaveError) + Send + Sync>;

/// Optional save notifications
#[derive(Clone, Default)]
pub struct AutoSaveHooks {
    /// Called after each successful write
    pub on_saved: Option<SavedHook>,
    /// Called after each failed write
    pub on_error: Option<ErrorHook>,
}

impl fmt::Debug for AutoSaveHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSaveHooks")
            .field("on_saved", &self.on_saved.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Auto-save engine
///
/// Tasks are created lazily per [`EntityKey`] and live until torn down.
#[derive(Debug)]
pub struct AutoSaveEngine {
    tasks: DashMap<EntityKey, Arc<AutoSaveTask>>,
    ctx: Arc<TaskContext>,
}

impl AutoSaveEngine {
    /// Create engine writing through `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn SaveSink>, access: Arc<dyn AccessPolicy>, settings: &AutoSaveSettings) -> Self {
        Self::with_hooks(sink, access, settings, AutoSaveHooks::default())
    }

    /// Create engine with save notifications
    #[must_use]
    pub fn with_hooks(
        sink: Arc<dyn SaveSink>,
        access: Arc<dyn AccessPolicy>,
        settings: &AutoSaveSettings,
        hooks: AutoSaveHooks,
    ) -> Self {
        Self {
            tasks: DashMap::new(),
            ctx: Arc::new(TaskContext {
                sink,
                access,
                capability: settings.save_capability.clone(),
                delay: settings.delay(),
                hooks,
            }),
        }
    }

    fn task(&self, key: &EntityKey) -> Arc<AutoSaveTask> {
        Arc::clone(
            self.tasks
                .entry(key.clone())
                .or_insert_with(|| {
                    tracing::debug!(%key, "auto-save task created");
                    Arc::new(AutoSaveTask::new(key.clone(), Arc::clone(&self.ctx)))
                })
                .value(),
        )
    }

    fn existing(&self, key: &EntityKey) -> Option<Arc<AutoSaveTask>> {
        self.tasks.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Start tracking `key` with a known persisted snapshot
    ///
    /// # Errors
    /// Returns error if the snapshot cannot be converted to JSON
    pub fn track<T: Serialize>(&self, key: &EntityKey, snapshot: &T) -> EngineResult<()> {
        let snapshot = serde_json::to_value(snapshot)?;
        self.task(key).seed(snapshot);
        Ok(())
    }

    /// Check if `key` has a task
    #[inline]
    #[must_use]
    pub fn is_tracked(&self, key: &EntityKey) -> bool {
        self.tasks.contains_key(key)
    }

    /// Latest draft held for `key`
    #[must_use]
    pub fn latest_draft(&self, key: &EntityKey) -> Option<Value> {
        self.existing(key).and_then(|task| task.latest_draft())
    }

    /// Hand over the latest draft for `key`
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns error if the draft cannot be converted to JSON
    pub fn update_draft<T: Serialize>(&self, key: &EntityKey, draft: &T) -> EngineResult<DraftChange> {
        let draft = serde_json::to_value(draft)?;
        Ok(self.task(key).schedule(draft))
    }

    /// Cancel the timer for `key` and write immediately
    pub async fn force_save(&self, key: &EntityKey) -> SaveOutcome {
        match self.existing(key) {
            Some(task) => task.force_save().await,
            None => SaveOutcome::Clean,
        }
    }

    /// Force-save every tracked entity
    pub async fn flush_all(&self) -> Vec<(EntityKey, SaveOutcome)> {
        let tasks: Vec<(EntityKey, Arc<AutoSaveTask>)> = self
            .tasks
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (key, task) in tasks {
            outcomes.push((key, task.force_save().await));
        }
        outcomes
    }

    /// Forget the last error for `key`
    ///
    /// # Returns
    /// Whether there was an error to clear
    pub fn clear_error(&self, key: &EntityKey) -> bool {
        self.existing(key).is_some_and(|task| task.clear_error())
    }

    /// Current state of `key`, `None` if untracked
    #[must_use]
    pub fn status(&self, key: &EntityKey) -> Option<TaskStatus> {
        self.existing(key).map(|task| task.status())
    }

    /// Check if `key` has unsaved changes
    #[must_use]
    pub fn is_dirty(&self, key: &EntityKey) -> bool {
        self.existing(key).is_some_and(|task| task.is_dirty())
    }

    /// Stop tracking `key`, dropping any pending write
    ///
    /// # Returns
    /// Whether `key` was tracked
    pub fn teardown(&self, key: &EntityKey) -> bool {
        match self.tasks.remove(key) {
            Some((_, task)) => {
                if task.is_dirty() {
                    tracing::info!(%key, "tearing down with unsaved changes");
                }
                task.close();
                true
            }
            None => false,
        }
    }

    /// Tear down every task whose key satisfies `pred`
    pub fn teardown_matching(&self, pred: impl Fn(&EntityKey) -> bool) -> usize {
        let keys: Vec<EntityKey> = self
            .tasks
            .iter()
            .filter(|entry| pred(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.iter().filter(|key| self.teardown(key)).count()
    }

    /// Tear down every task
    pub fn teardown_all(&self) -> usize {
        self.teardown_matching(|_| true)
    }

    /// Number of tracked entities
    #[inline]
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{capabilities, MockAccessPolicy};
    use crate::error::{EngineError, EngineResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use planboard_core::ItemTypeId;
    use planboard_storage::StorageError;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Recorder {
        saves: Mutex<Vec<(EntityKey, Value)>>,
        failing: AtomicBool,
        latency_ms: AtomicU64,
    }

    #[async_trait]
    impl SaveSink for Recorder {
        async fn save(&self, key: &EntityKey, draft: &Value) -> EngineResult<()> {
            let latency = self.latency_ms.load(Ordering::SeqCst);
            if latency > 0 {
                tokio::time::sleep(Duration::from_millis(latency)).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    requested: 10,
                    limit: 1,
                }
                .into());
            }
            self.saves.lock().push((key.clone(), draft.clone()));
            Ok(())
        }
    }

    impl Recorder {
        fn count(&self) -> usize {
            self.saves.lock().len()
        }

        fn last(&self) -> Option<Value> {
            self.saves.lock().last().map(|(_, v)| v.clone())
        }

        fn written(&self) -> Vec<Value> {
            self.saves.lock().iter().map(|(_, v)| v.clone()).collect()
        }
    }

    fn allow_all() -> Arc<dyn AccessPolicy> {
        Arc::new(|_: &str| true)
    }

    fn engine(sink: &Arc<Recorder>) -> AutoSaveEngine {
        AutoSaveEngine::new(
            Arc::clone(sink) as Arc<dyn SaveSink>,
            allow_all(),
            &AutoSaveSettings::default(),
        )
    }

    fn key() -> EntityKey {
        EntityKey::item(ItemTypeId::Countdown, "c1")
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_collapse_into_one_write() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        for n in 0..5 {
            assert_eq!(engine.update_draft(&key(), &json!({"name": n})).unwrap(), DraftChange::Scheduled);
            advance(200).await;
        }
        assert_eq!(sink.count(), 0);
        assert_eq!(engine.status(&key()).unwrap().state, TaskState::PendingTimer);

        advance(1_000).await;
        assert_eq!(sink.count(), 1);
        assert_eq!(sink.last(), Some(json!({"name": 4})));
        assert!(!engine.is_dirty(&key()));
        assert_eq!(engine.status(&key()).unwrap().state, TaskState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn persisted_draft_is_a_no_op() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        engine.update_draft(&key(), &json!({"name": "Trip"})).unwrap();
        advance(1_100).await;
        assert_eq!(sink.count(), 1);

        assert_eq!(engine.update_draft(&key(), &json!({"name": "Trip"})).unwrap(), DraftChange::Unchanged);
        advance(2_000).await;
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_snapshot_suppresses_identical_draft() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        engine.track(&key(), &json!({"name": "Trip"})).unwrap();
        assert!(!engine.is_dirty(&key()));
        assert_eq!(engine.update_draft(&key(), &json!({"name": "Trip"})).unwrap(), DraftChange::Unchanged);

        // Editing away and back again cancels the pending write
        engine.update_draft(&key(), &json!({"name": "Tri"})).unwrap();
        engine.update_draft(&key(), &json!({"name": "Trip"})).unwrap();
        advance(2_000).await;
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn revert_during_write_is_saved_after_it() {
        let sink = Arc::new(Recorder::default());
        sink.latency_ms.store(500, Ordering::SeqCst);
        let engine = engine(&sink);

        engine.track(&key(), &json!({"name": "A"})).unwrap();
        assert_eq!(engine.update_draft(&key(), &json!({"name": "B"})).unwrap(), DraftChange::Scheduled);

        // Timer fires at 1000 ms; the write of B runs until 1500 ms
        advance(1_100).await;
        assert_eq!(engine.status(&key()).unwrap().state, TaskState::Saving);

        assert_eq!(engine.update_draft(&key(), &json!({"name": "A"})).unwrap(), DraftChange::Scheduled);
        advance(5_000).await;

        assert_eq!(sink.written(), vec![json!({"name": "B"}), json!({"name": "A"})]);
        assert!(!engine.is_dirty(&key()));
        assert_eq!(engine.status(&key()).unwrap().state, TaskState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn force_save_bypasses_timer() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        engine.update_draft(&key(), &json!({"name": "Now"})).unwrap();
        assert!(engine.force_save(&key()).await.is_saved());
        assert_eq!(sink.count(), 1);

        // The cancelled timer must not write again
        advance(2_000).await;
        assert_eq!(sink.count(), 1);
        assert!(matches!(engine.force_save(&key()).await, SaveOutcome::Clean));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_stays_dirty_until_retry() {
        let sink = Arc::new(Recorder::default());
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&errors);
        let hooks = AutoSaveHooks {
            on_saved: None,
            on_error: Some(Arc::new(move |_: &SaveError| {
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        };
        let engine = AutoSaveEngine::with_hooks(
            Arc::clone(&sink) as Arc<dyn SaveSink>,
            allow_all(),
            &AutoSaveSettings::default(),
            hooks,
        );

        sink.failing.store(true, Ordering::SeqCst);
        engine.update_draft(&key(), &json!({"total": 100})).unwrap();
        advance(1_100).await;

        let status = engine.status(&key()).unwrap();
        assert!(status.dirty);
        assert!(status.last_error.as_ref().is_some_and(SaveError::is_storage));
        assert_eq!(errors.load(Ordering::SeqCst), 1);

        sink.failing.store(false, Ordering::SeqCst);
        assert!(engine.force_save(&key()).await.is_saved());
        let status = engine.status(&key()).unwrap();
        assert!(!status.dirty);
        assert!(status.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_error_resets_status() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        sink.failing.store(true, Ordering::SeqCst);
        engine.update_draft(&key(), &json!({"total": 1})).unwrap();
        assert!(matches!(engine.force_save(&key()).await, SaveOutcome::Failed(_)));

        assert!(engine.clear_error(&key()));
        assert!(!engine.clear_error(&key()));
        assert!(engine.is_dirty(&key()));
    }

    #[tokio::test(start_paused = true)]
    async fn denied_save_is_skipped_and_stays_dirty() {
        let sink = Arc::new(Recorder::default());
        let mut policy = MockAccessPolicy::new();
        policy
            .expect_can_access()
            .withf(|cap| cap == capabilities::SAVE_DATA)
            .returning(|_| false);
        let engine = AutoSaveEngine::new(
            Arc::clone(&sink) as Arc<dyn SaveSink>,
            Arc::new(policy),
            &AutoSaveSettings::default(),
        );

        engine.update_draft(&key(), &json!({"name": "Guest"})).unwrap();
        advance(1_100).await;
        assert_eq!(sink.count(), 0);
        assert!(engine.is_dirty(&key()));
        assert!(matches!(engine.force_save(&key()).await, SaveOutcome::Skipped));
        assert!(engine.status(&key()).unwrap().last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_drops_pending_write() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        engine.update_draft(&key(), &json!({"name": "Gone"})).unwrap();
        assert!(engine.teardown(&key()));
        assert!(!engine.teardown(&key()));
        advance(2_000).await;

        assert_eq!(sink.count(), 0);
        assert!(!engine.is_tracked(&key()));
        assert!(matches!(engine.force_save(&key()).await, SaveOutcome::Clean));
    }

    #[tokio::test(start_paused = true)]
    async fn entities_are_independent() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);
        let other = EntityKey::draft(ItemTypeId::Budget, "w1");

        engine.update_draft(&key(), &json!({"a": 1})).unwrap();
        advance(500).await;
        engine.update_draft(&other, &json!({"b": 2})).unwrap();
        advance(600).await;
        assert_eq!(sink.count(), 1);

        advance(500).await;
        assert_eq!(sink.count(), 2);

        assert_eq!(engine.teardown_matching(|k| matches!(k, EntityKey::Draft { .. })), 1);
        assert_eq!(engine.active_tasks(), 1);
        assert_eq!(engine.teardown_all(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_all_writes_everything_dirty() {
        let sink = Arc::new(Recorder::default());
        let engine = engine(&sink);

        engine.update_draft(&key(), &json!({"a": 1})).unwrap();
        engine.update_draft(&EntityKey::draft(ItemTypeId::Packing, "w2"), &json!({"b": 1})).unwrap();

        let outcomes = engine.flush_all().await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| o.is_saved()));
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn saved_hook_fires_once_per_write() {
        let sink = Arc::new(Recorder::default());
        let saved = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&saved);
        let hooks = AutoSaveHooks {
            on_saved: Some(Arc::new(move |_: &EntityKey| {
                seen.fetch_add(1, Ordering::SeqCst);
            })),
            on_error: None,
        };
        let engine = AutoSaveEngine::with_hooks(
            Arc::clone(&sink) as Arc<dyn SaveSink>,
            allow_all(),
            &AutoSaveSettings::default(),
            hooks,
        );

        engine.update_draft(&key(), &json!({"a": 1})).unwrap();
        advance(1_100).await;
        engine.update_draft(&key(), &json!({"a": 2})).unwrap();
        advance(1_100).await;
        assert_eq!(saved.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn error_hook_type_accepts_engine_errors() {
        let err = SaveError::new(key(), EngineError::item_not_found(ItemTypeId::Countdown, "c1"));
        assert!(!err.is_storage());
    }
}
