//! Save targets for the auto-save engine

use crate::error::{EngineError, EngineResult};
use crate::registry::PluginRegistry;
use async_trait::async_trait;
use planboard_core::{ItemId, ItemTypeId, WidgetId};
use serde_json::Value;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

/// Entity whose edits are tracked
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Saved item being edited
    Item {
        /// Item type
        item_type: ItemTypeId,
        /// Item id
        id: ItemId,
    },
    /// Unbound widget's draft
    Draft {
        /// Widget's item type
        item_type: ItemTypeId,
        /// Widget id
        widget_id: WidgetId,
    },
}

impl EntityKey {
    /// Key for an item
    #[inline]
    #[must_use]
    pub fn item(item_type: ItemTypeId, id: impl Into<ItemId>) -> Self {
        Self::Item {
            item_type,
            id: id.into(),
        }
    }

    /// Key for a widget draft
    #[inline]
    #[must_use]
    pub fn draft(item_type: ItemTypeId, widget_id: impl Into<WidgetId>) -> Self {
        Self::Draft {
            item_type,
            widget_id: widget_id.into(),
        }
    }

    /// Item type of the entity
    #[inline]
    #[must_use]
    pub fn item_type(&self) -> ItemTypeId {
        match self {
            Self::Item { item_type, .. } | Self::Draft { item_type, .. } => *item_type,
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item { item_type, id } => write!(f, "{item_type}/item/{id}"),
            Self::Draft { item_type, widget_id } => write!(f, "{item_type}/draft/{widget_id}"),
        }
    }
}

/// Persistence callback for a tracked entity
#[async_trait]
pub trait SaveSink: Send + Sync + Debug {
    /// Persist `draft` for `key`
    ///
    /// # Errors
    /// Returns error if the draft could not be persisted
    async fn save(&self, key: &EntityKey, draft: &Value) -> EngineResult<()>;
}

/// Sink that routes saves through the owning plugin
///
/// Items are shallow-merged with `update_item`; widget drafts go to
/// `apply_draft_to_live_state`.
#[derive(Debug, Clone)]
pub struct RegistrySink {
    registry: Arc<PluginRegistry>,
}

impl RegistrySink {
    /// Create sink over a registry
    #[inline]
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SaveSink for RegistrySink {
    async fn save(&self, key: &EntityKey, draft: &Value) -> EngineResult<()> {
        let plugin = self
            .registry
            .get_plugin(key.item_type())
            .ok_or(EngineError::UnknownPlugin(key.item_type()))?;

        match key {
            EntityKey::Item { item_type, id } => {
                if plugin.update_item(id, draft)? {
                    Ok(())
                } else {
                    Err(EngineError::item_not_found(*item_type, id.clone()))
                }
            }
            EntityKey::Draft { widget_id, .. } => plugin.apply_draft_to_live_state(widget_id, draft),
        }
    }
}
