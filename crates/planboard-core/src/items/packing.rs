use super::{Item, ItemMeta, ItemRecord};
use crate::item_type::ItemTypeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One thing to pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingEntry {
    /// Entry identifier
    pub id: String,
    /// What to pack
    pub name: String,
    /// Grouping label
    #[serde(default)]
    pub category: String,
    /// How many
    #[serde(default = "one")]
    pub quantity: u32,
    /// Already packed
    #[serde(default)]
    pub packed: bool,
}

fn one() -> u32 {
    1
}

/// Packed vs. total entry count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PackingProgress {
    /// Entries marked packed
    pub packed: usize,
    /// All entries
    pub total: usize,
}

impl PackingProgress {
    /// Everything is packed (an empty list counts as done)
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.packed == self.total
    }
}

/// Packing checklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingItem {
    /// Shared metadata
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Checklist entries
    #[serde(default)]
    pub entries: Vec<PackingEntry>,
}

impl PackingItem {
    /// Count packed entries
    #[must_use]
    pub fn progress(&self) -> PackingProgress {
        PackingProgress {
            packed: self.entries.iter().filter(|e| e.packed).count(),
            total: self.entries.len(),
        }
    }
}

impl ItemRecord for PackingItem {
    const ITEM_TYPE: ItemTypeId = ItemTypeId::Packing;

    fn create_default(meta: ItemMeta) -> Self {
        Self {
            meta,
            entries: Vec::new(),
        }
    }

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn render_payload(&self, _now: DateTime<Utc>) -> Value {
        json!({
            "entries": self.entries,
            "progress": self.progress(),
        })
    }

    fn into_item(self) -> Item {
        Item::Packing(self)
    }
}
