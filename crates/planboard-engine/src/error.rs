//! Error types for the planboard engine
//!
//! Provides error handling for:
//! - Plugin lookup and item access
//! - Widget reordering
//! - Auto-save failures
//! - Configuration loading
//!
//! Storage failures arrive as [`StorageError`] and are wrapped, never
//! swallowed here; the components that promise "never crash the UI"
//! decide to log and continue.

use crate::autosave::EntityKey;
use planboard_core::{CoreError, ItemId, ItemTypeId, WidgetId};
use planboard_storage::StorageError;
use std::path::PathBuf;
use std::sync::Arc;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Storage medium failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// No plugin registered for the item type
    #[error("no plugin registered for item type: {0}")]
    UnknownPlugin(ItemTypeId),

    /// Item does not exist
    #[error("{item_type} item not found: {id}")]
    ItemNotFound {
        /// Item type searched
        item_type: ItemTypeId,
        /// Missing id
        id: ItemId,
    },

    /// Widget instance does not exist
    #[error("widget not found: {0}")]
    WidgetNotFound(WidgetId),

    /// Item would violate an invariant
    #[error("invalid item: {0}")]
    InvalidItem(#[from] CoreError),

    /// Partial update could not be applied to the item shape
    #[error("invalid partial update: {0}")]
    InvalidPartial(String),

    /// Draft could not be converted to JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Widget references to an item could not be cleared
    #[error("could not clear widget references to {item_type} item {id}: {source}")]
    ReferenceCleanup {
        /// Type of the item being deleted
        item_type: ItemTypeId,
        /// Item being deleted
        id: ItemId,
        /// Storage failure behind it
        #[source]
        source: StorageError,
    },
}

impl EngineError {
    /// Create item-not-found error
    #[inline]
    pub fn item_not_found(item_type: ItemTypeId, id: impl Into<ItemId>) -> Self {
        Self::ItemNotFound {
            item_type,
            id: id.into(),
        }
    }

    /// Check if error comes from the storage medium
    ///
    /// Such failures are worth retrying on the next edit.
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::ReferenceCleanup { .. })
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Failed auto-save attempt
///
/// Cheap to clone: the same failure is kept as the task's last error and
/// handed to the error hook.
#[derive(Debug, Clone, thiserror::Error)]
#[error("save failed for {key}: {source}")]
pub struct SaveError {
    /// Entity whose save failed
    pub key: EntityKey,
    /// Underlying failure
    #[source]
    pub source: Arc<EngineError>,
}

impl SaveError {
    /// Create save error for `key`
    #[inline]
    #[must_use]
    pub fn new(key: EntityKey, source: EngineError) -> Self {
        Self {
            key,
            source: Arc::new(source),
        }
    }

    /// Check if the underlying failure came from storage
    #[inline]
    #[must_use]
    pub fn is_storage(&self) -> bool {
        self.source.is_storage()
    }
}

/// Rejected widget reorder
///
/// A reorder must name every existing widget exactly once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderError {
    /// Id listed more than once
    #[error("widget listed more than once: {0}")]
    Duplicate(WidgetId),

    /// Id not in the configuration
    #[error("unknown widget in reorder: {0}")]
    Unknown(WidgetId),

    /// Existing widgets left out
    #[error("reorder omits {} widget(s)", .0.len())]
    Missing(Vec<WidgetId>),
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override has an unusable value
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Offending value
        value: String,
    },
}
