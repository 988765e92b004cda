//! Planboard Storage
//!
//! Local persistence for the planboard engine.
//!
//! # Core Concepts
//!
//! - [`KeyValueStore`]: synchronous string-keyed medium (get/set/remove/update)
//! - [`MemoryStore`]: in-process store with an optional byte quota
//! - [`FileStore`]: single-file JSON store for the command line
//! - [`UnifiedStorage`]: collection CRUD with a read-through, write-through cache
//!
//! # Example
//!
//! ```rust
//! use planboard_storage::{MemoryStore, UnifiedStorage};
//! use std::sync::Arc;
//!
//! let storage = UnifiedStorage::new(Arc::new(MemoryStore::new()));
//! storage.add_item("notes", &serde_json::json!({"id": "1", "text": "hi"})).unwrap();
//!
//! let notes: Vec<serde_json::Value> = storage.get_collection("notes");
//! assert_eq!(notes.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod adapter;
pub mod error;
pub mod file;
pub mod unified;

// Re-exports for convenience
pub use adapter::{KeyValueStore, MemoryStore};
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use unified::{CacheStats, UnifiedStorage, DEFAULT_KEY_PREFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
