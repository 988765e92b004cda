//! Planboard Core
//!
//! Domain types shared by the planboard engine:
//! - Identifiers for items and widgets
//! - Item types and access tiers
//! - The four saved item shapes
//! - Widget instances and patches
//! - Countdown arithmetic

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod countdown;
pub mod error;
pub mod ids;
pub mod item_type;
pub mod items;
pub mod widget;

// Re-exports for convenience
pub use countdown::{diff, CountdownParts};
pub use error::{CoreError, CoreResult};
pub use ids::{ItemId, WidgetId};
pub use item_type::{AccessTier, ItemTypeId};
pub use items::{
    BudgetItem, CountdownItem, Item, ItemMeta, ItemRecord, ItineraryItem, PackingItem,
};
pub use widget::{WidgetInstance, WidgetPatch, WidgetSize, WIDGET_CONFIGS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
