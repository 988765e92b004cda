//! Access-tier capability checks
//!
//! The engine never evaluates user tiers itself; it asks an
//! [`AccessPolicy`] whether a named capability is available.

use planboard_core::{AccessTier, ItemTypeId};
use std::collections::HashMap;

/// Well-known capability names
pub mod capabilities {
    use planboard_core::ItemTypeId;

    /// Persisting user data (auto-save, explicit save)
    pub const SAVE_DATA: &str = "save-data";

    /// Using the plugin for an item type
    #[must_use]
    pub fn plugin(item_type: ItemTypeId) -> String {
        format!("plugin:{item_type}")
    }
}

/// Boolean capability predicate supplied by user management
#[cfg_attr(test, mockall::automock)]
pub trait AccessPolicy: Send + Sync {
    /// Check if the current user may use `capability`
    fn can_access(&self, capability: &str) -> bool;
}

impl<F> AccessPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn can_access(&self, capability: &str) -> bool {
        self(capability)
    }
}

/// Policy that maps capabilities to the minimum tier they need
///
/// Capabilities without an entry are denied.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    tier: AccessTier,
    requirements: HashMap<String, AccessTier>,
}

impl TierPolicy {
    /// Create policy for `tier` with the default requirement table
    ///
    /// Saving data needs a standard account.
    #[must_use]
    pub fn new(tier: AccessTier) -> Self {
        let mut requirements = HashMap::new();
        requirements.insert(capabilities::SAVE_DATA.to_string(), AccessTier::Standard);
        Self { tier, requirements }
    }

    /// Require `tier` for `capability`
    #[inline]
    #[must_use]
    pub fn require(mut self, capability: impl Into<String>, tier: AccessTier) -> Self {
        self.requirements.insert(capability.into(), tier);
        self
    }

    /// Require `tier` for the plugin capability of `item_type`
    #[inline]
    #[must_use]
    pub fn require_plugin(self, item_type: ItemTypeId, tier: AccessTier) -> Self {
        self.require(capabilities::plugin(item_type), tier)
    }

    /// Tier being evaluated
    #[inline]
    #[must_use]
    pub fn tier(&self) -> AccessTier {
        self.tier
    }
}

impl AccessPolicy for TierPolicy {
    fn can_access(&self, capability: &str) -> bool {
        match self.requirements.get(capability) {
            Some(required) => self.tier.satisfies(*required),
            None => {
                tracing::debug!(capability, "no requirement registered, denying");
                false
            }
        }
    }
}
