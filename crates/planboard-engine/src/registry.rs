//! Plugin registry
//!
//! Provides [`PluginRegistry`], the lookup table from [`ItemTypeId`] to
//! [`ItemPlugin`]. Registration order is preserved for pickers.

use crate::access::{capabilities, AccessPolicy};
use crate::collection_plugin::builtin_plugins;
use crate::config_manager::WidgetConfigManager;
use crate::plugin::ItemPlugin;
use planboard_core::ItemTypeId;
use planboard_storage::UnifiedStorage;
use std::sync::Arc;

/// Registry of item plugins
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn ItemPlugin>>,
}

impl PluginRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// Create registry with the built-in plugins
    #[must_use]
    pub fn with_builtin(storage: &Arc<UnifiedStorage>, widgets: &Arc<WidgetConfigManager>) -> Self {
        let mut registry = Self::new();
        for plugin in builtin_plugins(storage, widgets) {
            registry.register(plugin);
        }
        registry
    }

    /// Register a plugin
    ///
    /// A plugin for an already registered type replaces it in place.
    pub fn register(&mut self, plugin: Arc<dyn ItemPlugin>) {
        let item_type = plugin.id();
        match self.plugins.iter_mut().find(|p| p.id() == item_type) {
            Some(slot) => {
                tracing::warn!(%item_type, "replacing registered plugin");
                *slot = plugin;
            }
            None => {
                tracing::debug!(%item_type, "plugin registered");
                self.plugins.push(plugin);
            }
        }
    }

    /// Plugin for `item_type`
    #[must_use]
    pub fn get_plugin(&self, item_type: ItemTypeId) -> Option<Arc<dyn ItemPlugin>> {
        self.plugins.iter().find(|p| p.id() == item_type).cloned()
    }

    /// Every plugin, in registration order
    #[must_use]
    pub fn get_all_plugins(&self) -> Vec<Arc<dyn ItemPlugin>> {
        self.plugins.clone()
    }

    /// Plugins the policy allows, in registration order
    #[must_use]
    pub fn available_plugins(&self, access: &dyn AccessPolicy) -> Vec<Arc<dyn ItemPlugin>> {
        self.plugins
            .iter()
            .filter(|p| access.can_access(&capabilities::plugin(p.id())))
            .cloned()
            .collect()
    }

    /// Check if a plugin serves `item_type`
    #[inline]
    #[must_use]
    pub fn contains(&self, item_type: ItemTypeId) -> bool {
        self.plugins.iter().any(|p| p.id() == item_type)
    }

    /// Get number of registered plugins
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
