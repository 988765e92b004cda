//! Saved item shapes
//!
//! Every item carries [`ItemMeta`] (id, name, timestamps) flattened into its
//! JSON object, plus a type-specific payload. [`ItemRecord`] is the bridge
//! that lets one generic plugin implementation serve all four types.

mod budget;
mod countdown;
mod itinerary;
mod packing;

pub use budget::{BudgetCategory, BudgetItem, Expense};
pub use countdown::{CountdownItem, CountdownSettings, ParkRef};
pub use itinerary::{ItineraryDay, ItineraryEntry, ItineraryItem};
pub use packing::{PackingEntry, PackingItem, PackingProgress};

use crate::error::CoreError;
use crate::ids::ItemId;
use crate::item_type::ItemTypeId;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// Fields shared by every saved item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMeta {
    /// Unique, never reused
    pub id: ItemId,
    /// Display name; never empty once saved
    pub name: String,
    /// Creation instant
    pub created_at: DateTime<Utc>,
    /// Last modification instant; never moves backwards
    pub updated_at: DateTime<Utc>,
}

impl ItemMeta {
    /// Create metadata for a new item
    ///
    /// A blank `name` falls back to `default_name`.
    #[must_use]
    pub fn new(name: Option<&str>, default_name: &str, now: DateTime<Utc>) -> Self {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(default_name);
        Self {
            id: ItemId::generate(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance `updated_at`, never moving it backwards
    #[inline]
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Check the invariants a saved item must hold
    ///
    /// # Errors
    /// Returns `CoreError::InvalidItem` for a blank name or timestamps out of order
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidItem(format!("item {} has an empty name", self.id)));
        }
        if self.updated_at < self.created_at {
            return Err(CoreError::InvalidItem(format!(
                "item {} was updated before it was created",
                self.id
            )));
        }
        Ok(())
    }
}

/// Concrete item shape managed by a plugin
pub trait ItemRecord: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Type this record belongs to
    const ITEM_TYPE: ItemTypeId;

    /// Build the default item for a freshly created entry
    fn create_default(meta: ItemMeta) -> Self;

    /// Shared metadata
    fn meta(&self) -> &ItemMeta;

    /// Shared metadata, mutable
    fn meta_mut(&mut self) -> &mut ItemMeta;

    /// Type-specific data handed to a widget for rendering
    fn render_payload(&self, now: DateTime<Utc>) -> Value;

    /// Wrap into the polymorphic [`Item`]
    fn into_item(self) -> Item;
}

/// Any saved item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item {
    /// Countdown item
    Countdown(CountdownItem),
    /// Budget item
    Budget(BudgetItem),
    /// Packing item
    Packing(PackingItem),
    /// Itinerary item
    Itinerary(ItineraryItem),
}

impl Item {
    /// Shared metadata
    #[must_use]
    pub fn meta(&self) -> &ItemMeta {
        match self {
            Item::Countdown(item) => item.meta(),
            Item::Budget(item) => item.meta(),
            Item::Packing(item) => item.meta(),
            Item::Itinerary(item) => item.meta(),
        }
    }

    /// Item type
    #[must_use]
    pub fn item_type(&self) -> ItemTypeId {
        match self {
            Item::Countdown(_) => CountdownItem::ITEM_TYPE,
            Item::Budget(_) => BudgetItem::ITEM_TYPE,
            Item::Packing(_) => PackingItem::ITEM_TYPE,
            Item::Itinerary(_) => ItineraryItem::ITEM_TYPE,
        }
    }

    /// Item id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.meta().id
    }

    /// Item name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta().name
    }
}
