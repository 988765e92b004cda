//! Per-entity debounce task

use super::sink::{EntityKey, SaveSink};
use super::AutoSaveHooks;
use crate::access::AccessPolicy;
use crate::error::SaveError;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Result of handing a new draft to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftChange {
    /// Draft differs from what was persisted; a save is pending
    Scheduled,
    /// Draft equals the persisted snapshot; nothing pending
    Unchanged,
}

/// Result of a save attempt
#[derive(Debug, Clone)]
#[must_use]
pub enum SaveOutcome {
    /// Latest draft persisted
    Saved,
    /// Nothing to write
    Clean,
    /// Access policy denied the write; draft stays dirty
    Skipped,
    /// Sink failed; draft stays dirty
    Failed(SaveError),
    /// Task was torn down
    Cancelled,
}

impl SaveOutcome {
    /// Check if a write happened
    #[inline]
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// No timer, no write in progress
    Idle,
    /// Debounce timer running
    PendingTimer,
    /// Write in progress
    Saving,
}

/// Snapshot of a task's state
#[derive(Debug, Clone)]
pub struct TaskStatus {
    /// Lifecycle state
    pub state: TaskState,
    /// Latest draft differs from the persisted snapshot
    pub dirty: bool,
    /// Most recent failure, cleared by a successful save
    pub last_error: Option<SaveError>,
}

/// Shared by every task of one engine
pub(crate) struct TaskContext {
    pub(crate) sink: Arc<dyn SaveSink>,
    pub(crate) access: Arc<dyn AccessPolicy>,
    pub(crate) capability: String,
    pub(crate) delay: Duration,
    pub(crate) hooks: AutoSaveHooks,
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("sink", &self.sink)
            .field("capability", &self.capability)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct TaskInner {
    latest_draft: Option<Value>,
    last_persisted: Option<Value>,
    pending: Option<JoinHandle<()>>,
    /// Bumped on every reschedule; a timer only fires for its own generation
    generation: u64,
    in_flight: bool,
    closed: bool,
    last_error: Option<SaveError>,
}

impl TaskInner {
    fn is_dirty(&self) -> bool {
        match &self.latest_draft {
            Some(draft) => self.last_persisted.as_ref() != Some(draft),
            None => false,
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Debounced writer for one entity
#[derive(Debug)]
pub(crate) struct AutoSaveTask {
    key: EntityKey,
    ctx: Arc<TaskContext>,
    state: Mutex<TaskInner>,
    /// Serializes writes so the last one wins
    save_lock: tokio::sync::Mutex<()>,
}

impl AutoSaveTask {
    pub(crate) fn new(key: EntityKey, ctx: Arc<TaskContext>) -> Self {
        Self {
            key,
            ctx,
            state: Mutex::new(TaskInner::default()),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Seed the persisted snapshot
    pub(crate) fn seed(&self, snapshot: Value) {
        let mut state = self.state.lock();
        if state.latest_draft.is_none() {
            state.latest_draft = Some(snapshot.clone());
        }
        state.last_persisted = Some(snapshot);
    }

    pub(crate) fn latest_draft(&self) -> Option<Value> {
        self.state.lock().latest_draft.clone()
    }

    /// Record a new draft and restart the debounce timer if it is dirty
    pub(crate) fn schedule(self: &Arc<Self>, draft: Value) -> DraftChange {
        let mut state = self.state.lock();
        if state.closed {
            tracing::debug!(key = %self.key, "draft for closed task ignored");
            return DraftChange::Unchanged;
        }

        state.cancel_timer();
        state.latest_draft = Some(draft);
        // While a write is in flight the persisted snapshot is about to change,
        // so a draft matching the old snapshot still needs its own save
        if !state.in_flight && !state.is_dirty() {
            tracing::debug!(key = %self.key, "draft matches persisted state");
            return DraftChange::Unchanged;
        }

        let generation = state.generation;
        let delay = self.ctx.delay;
        let task: Weak<Self> = Arc::downgrade(self);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(task) = task.upgrade() {
                task.fire(generation).await;
            }
        }));
        tracing::debug!(key = %self.key, delay_ms = delay.as_millis(), "save scheduled");
        DraftChange::Scheduled
    }

    async fn fire(&self, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.closed || state.generation != generation {
                tracing::debug!(key = %self.key, "stale timer ignored");
                return;
            }
            // Detach so an abort cannot interrupt the write
            state.pending = None;
        }
        let _ = self.save().await;
    }

    /// Cancel the timer and write now
    pub(crate) async fn force_save(&self) -> SaveOutcome {
        self.state.lock().cancel_timer();
        self.save().await
    }

    async fn save(&self) -> SaveOutcome {
        let _guard = self.save_lock.lock().await;

        let draft = {
            let mut state = self.state.lock();
            if state.closed {
                return SaveOutcome::Cancelled;
            }
            if !state.is_dirty() {
                return SaveOutcome::Clean;
            }
            let Some(draft) = state.latest_draft.clone() else {
                return SaveOutcome::Clean;
            };
            if !self.ctx.access.can_access(&self.ctx.capability) {
                tracing::info!(key = %self.key, capability = %self.ctx.capability, "save skipped, not permitted");
                return SaveOutcome::Skipped;
            }
            state.in_flight = true;
            draft
        };

        let result = self.ctx.sink.save(&self.key, &draft).await;

        let outcome = {
            let mut state = self.state.lock();
            state.in_flight = false;
            match result {
                Ok(()) => {
                    state.last_persisted = Some(draft);
                    state.last_error = None;
                    SaveOutcome::Saved
                }
                Err(err) => {
                    let err = SaveError::new(self.key.clone(), err);
                    state.last_error = Some(err.clone());
                    SaveOutcome::Failed(err)
                }
            }
        };

        match &outcome {
            SaveOutcome::Saved => {
                tracing::debug!(key = %self.key, "draft persisted");
                if let Some(hook) = &self.ctx.hooks.on_saved {
                    hook(&self.key);
                }
            }
            SaveOutcome::Failed(err) => {
                tracing::warn!(key = %self.key, error = %err.source, "auto-save failed");
                if let Some(hook) = &self.ctx.hooks.on_error {
                    hook(err);
                }
            }
            _ => {}
        }
        outcome
    }

    /// Abort the timer and refuse further work
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.cancel_timer();
        state.closed = true;
    }

    pub(crate) fn clear_error(&self) -> bool {
        self.state.lock().last_error.take().is_some()
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.state.lock().is_dirty()
    }

    pub(crate) fn status(&self) -> TaskStatus {
        let state = self.state.lock();
        let phase = if state.in_flight {
            TaskState::Saving
        } else if state.pending.is_some() {
            TaskState::PendingTimer
        } else {
            TaskState::Idle
        };
        TaskStatus {
            state: phase,
            dirty: state.is_dirty(),
            last_error: state.last_error.clone(),
        }
    }
}
