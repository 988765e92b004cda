//! Planboard Engine
//!
//! Widget configuration and debounced persistence for a trip-planning
//! dashboard.
//!
//! # Core Concepts
//!
//! - [`ItemPlugin`]: per-type accessors for items, drafts and render data
//! - [`PluginRegistry`]: lookup from [`ItemTypeId`] to plugin
//! - [`WidgetConfigManager`]: ordered widget layout with item bindings
//! - [`AutoSaveEngine`]: per-entity debounced write-back
//! - [`Planboard`]: wires everything over one [`KeyValueStore`]
//!
//! # Example
//!
//! ```rust,ignore
//! use planboard_engine::{Planboard, PlanboardConfig, TierPolicy};
//! use planboard_core::{AccessTier, ItemTypeId};
//! use planboard_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let board = Planboard::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(TierPolicy::new(AccessTier::Standard)),
//!     PlanboardConfig::default(),
//! );
//!
//! let id = board.create_item(ItemTypeId::Countdown, Some("Trip")).await?;
//! board.edit_item(ItemTypeId::Countdown, &id, &json!({"name": "Disney"}))?;
//! ```
//!
//! [`KeyValueStore`]: planboard_storage::KeyValueStore

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod access;
pub mod autosave;
pub mod collection_plugin;
pub mod config;
pub mod config_manager;
pub mod error;
pub mod planboard;
pub mod plugin;
pub mod registry;

// Re-exports for convenience
pub use access::{capabilities, AccessPolicy, TierPolicy};
pub use autosave::{
    AutoSaveEngine, AutoSaveHooks, DraftChange, EntityKey, ErrorHook, RegistrySink, SaveOutcome,
    SaveSink, SavedHook, TaskState, TaskStatus,
};
pub use collection_plugin::{builtin_plugins, CollectionPlugin, PluginInfo};
pub use config::{AutoSaveSettings, PlanboardConfig, StorageSettings, ENV_AUTOSAVE_DELAY_MS};
pub use config_manager::{ConfigChange, WidgetConfigManager};
pub use error::{ConfigError, EngineError, EngineResult, ReorderError, SaveError};
pub use planboard::{Planboard, PlanboardBuilder};
pub use plugin::{ItemPlugin, WidgetComponent, WidgetData};
pub use registry::PluginRegistry;

pub use planboard_core::ItemTypeId;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
