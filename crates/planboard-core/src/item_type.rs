//! Item type identifiers and access tiers

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Kind of saved item a plugin manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemTypeId {
    /// Countdown to a trip date
    Countdown,
    /// Trip budget with categories and expenses
    Budget,
    /// Packing checklist
    Packing,
    /// Day-by-day itinerary
    Itinerary,
}

impl ItemTypeId {
    /// Every item type, in built-in registration order
    pub const ALL: [ItemTypeId; 4] = [
        ItemTypeId::Countdown,
        ItemTypeId::Budget,
        ItemTypeId::Packing,
        ItemTypeId::Itinerary,
    ];

    /// Wire name of this type
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemTypeId::Countdown => "countdown",
            ItemTypeId::Budget => "budget",
            ItemTypeId::Packing => "packing",
            ItemTypeId::Itinerary => "itinerary",
        }
    }

    /// Collection holding saved items of this type
    #[inline]
    #[must_use]
    pub fn collection_name(&self) -> &'static str {
        match self {
            ItemTypeId::Countdown => "countdown-items",
            ItemTypeId::Budget => "budget-items",
            ItemTypeId::Packing => "packing-items",
            ItemTypeId::Itinerary => "itinerary-items",
        }
    }

    /// Collection holding unbound per-widget drafts of this type
    #[inline]
    #[must_use]
    pub fn draft_slot_name(&self) -> &'static str {
        match self {
            ItemTypeId::Countdown => "countdown-draft",
            ItemTypeId::Budget => "budget-draft",
            ItemTypeId::Packing => "packing-draft",
            ItemTypeId::Itinerary => "itinerary-draft",
        }
    }

    /// Name given to items created without one
    #[inline]
    #[must_use]
    pub fn default_item_name(&self) -> &'static str {
        match self {
            ItemTypeId::Countdown => "My Countdown",
            ItemTypeId::Budget => "My Budget",
            ItemTypeId::Packing => "My Packing List",
            ItemTypeId::Itinerary => "My Itinerary",
        }
    }
}

impl FromStr for ItemTypeId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemTypeId::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownItemType(s.to_string()))
    }
}

impl std::fmt::Display for ItemTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// User access tier, ordered from least to most capable
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    /// Not signed in; nothing is persisted
    #[default]
    Anonymous,
    /// Signed-in free account
    Standard,
    /// Paid account
    Premium,
}

impl AccessTier {
    /// Check if this tier satisfies `required`
    #[inline]
    #[must_use]
    pub fn satisfies(self, required: AccessTier) -> bool {
        self >= required
    }

    /// Wire name of this tier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessTier::Anonymous => "anonymous",
            AccessTier::Standard => "standard",
            AccessTier::Premium => "premium",
        }
    }
}

impl FromStr for AccessTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anonymous" => Ok(AccessTier::Anonymous),
            "standard" => Ok(AccessTier::Standard),
            "premium" => Ok(AccessTier::Premium),
            _ => Err(CoreError::UnknownAccessTier(s.to_string())),
        }
    }
}

impl std::fmt::Display for AccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}
