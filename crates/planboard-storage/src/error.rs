//! Error types for the storage layer
//!
//! Covers the failure modes of a synchronous key-value medium:
//! - Quota exhaustion
//! - Access denial (medium disabled or locked)
//! - IO failures of file-backed stores
//! - Serialization of collections

use std::path::PathBuf;

/// Storage error
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Writing the value would exceed the medium's capacity
    #[error("quota exceeded writing '{key}': {requested} bytes requested, {limit} bytes allowed")]
    QuotaExceeded {
        /// Physical key being written
        key: String,
        /// Total bytes the store would hold after the write
        requested: usize,
        /// Configured limit
        limit: usize,
    },

    /// The medium refused the operation
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// IO error in a file-backed store
    #[error("io error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A collection could not be serialized
    #[error("serialization failed for '{collection}': {source}")]
    Serialization {
        /// Logical collection name
        collection: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create serialization error for a collection
    pub fn serialization(collection: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            collection: collection.into(),
            source,
        }
    }

    /// Check if the failure is a capacity problem
    #[inline]
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
