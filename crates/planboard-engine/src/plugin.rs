//! Item plugin trait and render binding types
//!
//! Provides the [`ItemPlugin`] trait: the single seam through which the
//! engine reaches type-specific item behavior. Callers select a plugin by
//! [`ItemTypeId`] and never branch on the type afterwards.

use crate::error::EngineResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use planboard_core::{AccessTier, Item, ItemId, ItemTypeId, WidgetId};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// Opaque rendering binding for a plugin's widget
///
/// The engine stores and returns it; the UI layer interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WidgetComponent(&'static str);

impl WidgetComponent {
    /// Create binding from a component name
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Component name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Data a widget renders for its bound item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetData {
    /// Widget being rendered
    pub widget_id: WidgetId,
    /// Type of the bound item
    pub item_type: ItemTypeId,
    /// Bound item
    pub item_id: ItemId,
    /// Item display name
    pub name: String,
    /// Item's last modification
    pub updated_at: DateTime<Utc>,
    /// Type-specific render data
    pub payload: Value,
}

/// Accessor bundle for one item type
///
/// Implementations persist through the shared collection storage and keep
/// widget references consistent on delete.
#[async_trait]
pub trait ItemPlugin: Send + Sync + Debug {
    /// Item type served
    fn id(&self) -> ItemTypeId;

    /// Human-readable name
    fn display_name(&self) -> &str;

    /// Short description for pickers
    fn description(&self) -> &str;

    /// Minimum tier that may use this plugin
    fn required_tier(&self) -> AccessTier;

    /// Rendering binding for the widget
    fn widget_component(&self) -> WidgetComponent;

    /// Create and persist a default item
    ///
    /// # Errors
    /// Returns error if the item cannot be persisted
    async fn create_default_item(&self, name: Option<&str>) -> EngineResult<ItemId>;

    /// Look up an item
    fn get_item(&self, id: &ItemId) -> Option<Item>;

    /// All saved items of this type
    fn list_items(&self) -> Vec<Item>;

    /// Shallow-merge `partial` into an item
    ///
    /// # Returns
    /// `Ok(false)` if no item has that id
    ///
    /// # Errors
    /// Returns error if the merged item is invalid or cannot be persisted
    fn update_item(&self, id: &ItemId, partial: &Value) -> EngineResult<bool>;

    /// Delete an item after clearing every widget reference to it
    ///
    /// # Returns
    /// `Ok(false)` if no item had that id
    ///
    /// # Errors
    /// Returns error if references cannot be cleared or the delete fails
    fn delete_item(&self, id: &ItemId) -> EngineResult<bool>;

    /// Delete every item of this type after clearing all widget references
    ///
    /// # Errors
    /// Returns error if references cannot be cleared or the delete fails
    fn clear_items(&self) -> EngineResult<()>;

    /// Render data for a widget's binding
    ///
    /// `None` means "show the empty state": nothing is bound, or the bound
    /// item no longer exists.
    fn get_widget_data_for_binding(
        &self,
        widget_id: &WidgetId,
        item_id: Option<&ItemId>,
    ) -> Option<WidgetData>;

    /// Store an in-progress edit for a widget with no bound item
    ///
    /// # Errors
    /// Returns error if the draft cannot be persisted
    fn apply_draft_to_live_state(&self, widget_id: &WidgetId, draft: &Value) -> EngineResult<()>;

    /// Current draft for a widget
    fn get_draft(&self, widget_id: &WidgetId) -> Option<Value>;

    /// Drop a widget's draft
    ///
    /// # Errors
    /// Returns error if the draft slot cannot be written
    fn clear_draft(&self, widget_id: &WidgetId) -> EngineResult<bool>;
}
