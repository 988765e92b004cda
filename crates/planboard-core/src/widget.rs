//! Widget instances
//!
//! A widget instance is a positioned dashboard slot of one item type that
//! may show one saved item of that type.

use crate::error::CoreError;
use crate::ids::{ItemId, WidgetId};
use crate::item_type::ItemTypeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Collection holding the widget layout
pub const WIDGET_CONFIGS: &str = "widget-configs";

/// Widget footprint on the dashboard grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetSize {
    /// One column
    Small,
    /// Two columns
    #[default]
    Medium,
    /// Three columns
    Large,
    /// Full row
    Full,
}

impl WidgetSize {
    /// Default column span for this size
    #[inline]
    #[must_use]
    pub fn columns(&self) -> u8 {
        match self {
            WidgetSize::Small => 1,
            WidgetSize::Medium => 2,
            WidgetSize::Large => 3,
            WidgetSize::Full => 4,
        }
    }

    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetSize::Small => "small",
            WidgetSize::Medium => "medium",
            WidgetSize::Large => "large",
            WidgetSize::Full => "full",
        }
    }
}

impl std::fmt::Display for WidgetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WidgetSize {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(WidgetSize::Small),
            "medium" => Ok(WidgetSize::Medium),
            "large" => Ok(WidgetSize::Large),
            "full" => Ok(WidgetSize::Full),
            _ => Err(CoreError::UnknownWidgetSize(s.to_string())),
        }
    }
}

/// Configured widget slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInstance {
    /// Stable for the instance's lifetime
    pub id: WidgetId,
    /// Item type this widget displays
    #[serde(rename = "type")]
    pub widget_type: ItemTypeId,
    /// Dense zero-based position
    #[serde(default)]
    pub order: u32,
    /// Grid footprint
    #[serde(default)]
    pub size: WidgetSize,
    /// Column-span override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u8>,
    /// Bound item, always of `widget_type` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_item_id: Option<ItemId>,
    /// Widget-local display preferences
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl WidgetInstance {
    /// Create unbound widget with a fresh id
    #[must_use]
    pub fn new(widget_type: ItemTypeId, size: WidgetSize) -> Self {
        Self {
            id: WidgetId::generate(),
            widget_type,
            order: 0,
            size,
            width: None,
            selected_item_id: None,
            settings: Map::new(),
        }
    }

    /// With a specific id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<WidgetId>) -> Self {
        self.id = id.into();
        self
    }

    /// With a bound item
    #[inline]
    #[must_use]
    pub fn with_selected_item(mut self, item_id: ItemId) -> Self {
        self.selected_item_id = Some(item_id);
        self
    }

    /// With a column-span override
    #[inline]
    #[must_use]
    pub fn with_width(mut self, width: u8) -> Self {
        self.width = Some(width);
        self
    }

    /// Effective column span
    #[inline]
    #[must_use]
    pub fn columns(&self) -> u8 {
        self.width.unwrap_or_else(|| self.size.columns())
    }
}

/// Partial update for a widget instance
///
/// `None` leaves a field alone. For optional fields, `Some(None)` clears.
/// Id, type and order are not patchable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    /// New size
    pub size: Option<WidgetSize>,
    /// New width override
    pub width: Option<Option<u8>>,
    /// New binding
    pub selected_item_id: Option<Option<ItemId>>,
    /// Settings keys to merge
    pub settings: Option<Map<String, Value>>,
}

impl WidgetPatch {
    /// Patch that rebinds the widget
    #[inline]
    #[must_use]
    pub fn bind(item_id: Option<ItemId>) -> Self {
        Self {
            selected_item_id: Some(item_id),
            ..Self::default()
        }
    }

    /// With a new size
    #[inline]
    #[must_use]
    pub fn with_size(mut self, size: WidgetSize) -> Self {
        self.size = Some(size);
        self
    }

    /// With settings to merge
    #[inline]
    #[must_use]
    pub fn with_settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Apply to an instance
    ///
    /// # Returns
    /// Whether anything changed
    pub fn apply(&self, widget: &mut WidgetInstance) -> bool {
        let before = widget.clone();

        if let Some(size) = self.size {
            widget.size = size;
        }
        if let Some(width) = self.width {
            widget.width = width;
        }
        if let Some(selected) = &self.selected_item_id {
            widget.selected_item_id.clone_from(selected);
        }
        if let Some(settings) = &self.settings {
            for (key, value) in settings {
                widget.settings.insert(key.clone(), value.clone());
            }
        }

        *widget != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serializes_type_and_camel_case() {
        let widget = WidgetInstance::new(ItemTypeId::Countdown, WidgetSize::Small)
            .with_id("w1")
            .with_selected_item(ItemId::from("c1"));
        let json = serde_json::to_value(&widget).unwrap();

        assert_eq!(
            json,
            json!({
                "id": "w1",
                "type": "countdown",
                "order": 0,
                "size": "small",
                "selectedItemId": "c1",
                "settings": {}
            })
        );
    }

    #[test]
    fn deserializes_minimal_record() {
        let widget: WidgetInstance =
            serde_json::from_value(json!({"id": "w1", "type": "budget"})).unwrap();
        assert_eq!(widget.size, WidgetSize::Medium);
        assert_eq!(widget.order, 0);
        assert!(widget.selected_item_id.is_none());
        assert_eq!(widget.columns(), 2);
    }

    #[test]
    fn patch_reports_changes() {
        let mut widget = WidgetInstance::new(ItemTypeId::Packing, WidgetSize::Medium);

        let unchanged = WidgetPatch::default().with_size(WidgetSize::Medium);
        assert!(!unchanged.apply(&mut widget));

        let mut settings = Map::new();
        settings.insert("compact".into(), json!(true));
        let patch = WidgetPatch::bind(Some(ItemId::from("p1"))).with_settings(settings);
        assert!(patch.apply(&mut widget));
        assert_eq!(widget.selected_item_id, Some(ItemId::from("p1")));
        assert_eq!(widget.settings["compact"], json!(true));

        assert!(WidgetPatch::bind(None).apply(&mut widget));
        assert!(widget.selected_item_id.is_none());
    }

    #[test]
    fn width_override_wins() {
        let widget = WidgetInstance::new(ItemTypeId::Itinerary, WidgetSize::Full).with_width(2);
        assert_eq!(widget.columns(), 2);
        assert_eq!("LARGE".parse::<WidgetSize>().unwrap(), WidgetSize::Large);
    }
}
