//! Error types for core planboard types

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// String does not name a known item type
    #[error("unknown item type: '{0}'")]
    UnknownItemType(String),

    /// String does not name a known access tier
    #[error("unknown access tier: '{0}'")]
    UnknownAccessTier(String),

    /// String does not name a known widget size
    #[error("unknown widget size: '{0}'")]
    UnknownWidgetSize(String),

    /// Item data violates an invariant
    #[error("invalid item: {0}")]
    InvalidItem(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
