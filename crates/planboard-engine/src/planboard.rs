//! Planboard facade
//!
//! Wires storage, widget configuration, plugins and auto-save together
//! without any global state. Every component is constructed here and
//! shared through `Arc`.

use crate::access::AccessPolicy;
use crate::autosave::{
    AutoSaveEngine, AutoSaveHooks, DraftChange, EntityKey, ErrorHook, RegistrySink, SaveOutcome,
    SavedHook,
};
use crate::config::PlanboardConfig;
use crate::config_manager::{ConfigChange, WidgetConfigManager};
use crate::error::{EngineError, EngineResult};
use crate::plugin::{ItemPlugin, WidgetData};
use crate::registry::PluginRegistry;
use planboard_core::{Item, ItemId, ItemTypeId, WidgetId};
use planboard_storage::{KeyValueStore, UnifiedStorage};
use serde_json::Value;
use std::sync::Arc;

/// Builder for [`Planboard`]
pub struct PlanboardBuilder {
    store: Arc<dyn KeyValueStore>,
    access: Arc<dyn AccessPolicy>,
    config: PlanboardConfig,
    hooks: AutoSaveHooks,
}

impl std::fmt::Debug for PlanboardBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanboardBuilder")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl PlanboardBuilder {
    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PlanboardConfig) -> Self {
        self.config = config;
        self
    }

    /// With success hook
    #[inline]
    #[must_use]
    pub fn on_saved(mut self, hook: SavedHook) -> Self {
        self.hooks.on_saved = Some(hook);
        self
    }

    /// With failure hook
    #[inline]
    #[must_use]
    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.hooks.on_error = Some(hook);
        self
    }

    /// Build the facade
    #[must_use]
    pub fn build(self) -> Planboard {
        let storage = Arc::new(UnifiedStorage::with_prefix(
            self.store,
            self.config.storage.key_prefix.clone(),
        ));
        let widgets = Arc::new(WidgetConfigManager::new(Arc::clone(&storage)));
        let registry = Arc::new(PluginRegistry::with_builtin(&storage, &widgets));
        let sink = Arc::new(RegistrySink::new(Arc::clone(&registry)));
        let autosave = AutoSaveEngine::with_hooks(
            sink,
            Arc::clone(&self.access),
            &self.config.autosave,
            self.hooks,
        );

        tracing::info!(
            plugins = registry.len(),
            delay_ms = self.config.autosave.delay_ms,
            "planboard ready"
        );

        Planboard {
            storage,
            widgets,
            registry,
            autosave,
            access: self.access,
            config: self.config,
        }
    }
}

/// Planboard engine
pub struct Planboard {
    storage: Arc<UnifiedStorage>,
    widgets: Arc<WidgetConfigManager>,
    registry: Arc<PluginRegistry>,
    autosave: AutoSaveEngine,
    access: Arc<dyn AccessPolicy>,
    config: PlanboardConfig,
}

impl std::fmt::Debug for Planboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planboard")
            .field("storage", &self.storage)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Planboard {
    /// Create engine over `store`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, access: Arc<dyn AccessPolicy>, config: PlanboardConfig) -> Self {
        Self::builder(store, access).with_config(config).build()
    }

    /// Start a builder with default configuration
    #[must_use]
    pub fn builder(store: Arc<dyn KeyValueStore>, access: Arc<dyn AccessPolicy>) -> PlanboardBuilder {
        PlanboardBuilder {
            store,
            access,
            config: PlanboardConfig::default(),
            hooks: AutoSaveHooks::default(),
        }
    }

    /// Shared collection storage
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &Arc<UnifiedStorage> {
        &self.storage
    }

    /// Widget configuration
    #[inline]
    #[must_use]
    pub fn widgets(&self) -> &Arc<WidgetConfigManager> {
        &self.widgets
    }

    /// Plugin registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Auto-save engine
    #[inline]
    #[must_use]
    pub fn autosave(&self) -> &AutoSaveEngine {
        &self.autosave
    }

    /// Access policy in effect
    #[inline]
    #[must_use]
    pub fn access(&self) -> &Arc<dyn AccessPolicy> {
        &self.access
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PlanboardConfig {
        &self.config
    }

    /// Plugin for `item_type`
    ///
    /// # Errors
    /// Returns `EngineError::UnknownPlugin` if none is registered
    pub fn plugin(&self, item_type: ItemTypeId) -> EngineResult<Arc<dyn ItemPlugin>> {
        self.registry
            .get_plugin(item_type)
            .ok_or(EngineError::UnknownPlugin(item_type))
    }

    /// Plugins the access policy allows
    #[must_use]
    pub fn available_plugins(&self) -> Vec<Arc<dyn ItemPlugin>> {
        self.registry.available_plugins(self.access.as_ref())
    }

    /// Create a default item
    ///
    /// # Errors
    /// Returns error if the plugin is missing or the item cannot be persisted
    pub async fn create_item(&self, item_type: ItemTypeId, name: Option<&str>) -> EngineResult<ItemId> {
        self.plugin(item_type)?.create_default_item(name).await
    }

    /// Look up an item
    ///
    /// # Errors
    /// Returns `EngineError::UnknownPlugin` if none is registered
    pub fn get_item(&self, item_type: ItemTypeId, id: &ItemId) -> EngineResult<Option<Item>> {
        Ok(self.plugin(item_type)?.get_item(id))
    }

    /// All items of a type
    ///
    /// # Errors
    /// Returns `EngineError::UnknownPlugin` if none is registered
    pub fn list_items(&self, item_type: ItemTypeId) -> EngineResult<Vec<Item>> {
        Ok(self.plugin(item_type)?.list_items())
    }

    /// Delete an item, its widget references and its pending edits
    ///
    /// # Errors
    /// Returns error if references cannot be cleared or the delete fails
    pub fn delete_item(&self, item_type: ItemTypeId, id: &ItemId) -> EngineResult<bool> {
        let plugin = self.plugin(item_type)?;
        // A timer firing after the delete would write to a missing item
        self.autosave.teardown(&EntityKey::item(item_type, id.clone()));
        plugin.delete_item(id)
    }

    /// Delete every item of a type
    ///
    /// # Errors
    /// Returns error if references cannot be cleared or the delete fails
    pub fn clear_items(&self, item_type: ItemTypeId) -> EngineResult<()> {
        self.plugin(item_type)?.clear_items()?;
        self.autosave
            .teardown_matching(|key| matches!(key, EntityKey::Item { item_type: t, .. } if *t == item_type));
        Ok(())
    }

    /// Shallow-merge `partial` into the edit buffer of an item
    ///
    /// The first edit seeds the persisted snapshot from the stored item, so
    /// edits that restore the stored values schedule nothing.
    ///
    /// # Errors
    /// Returns `EngineError::ItemNotFound` for an unknown item, or an error
    /// if `partial` is not a JSON object
    pub fn edit_item(&self, item_type: ItemTypeId, id: &ItemId, partial: &Value) -> EngineResult<DraftChange> {
        let Some(patch) = partial.as_object() else {
            return Err(EngineError::InvalidPartial("partial update must be a JSON object".into()));
        };

        let key = EntityKey::item(item_type, id.clone());
        let base = match self.autosave.latest_draft(&key) {
            Some(draft) => draft,
            None => {
                let item = self
                    .plugin(item_type)?
                    .get_item(id)
                    .ok_or_else(|| EngineError::item_not_found(item_type, id.clone()))?;
                self.autosave.track(&key, &item)?;
                serde_json::to_value(&item)?
            }
        };

        let mut draft = base;
        if let Value::Object(fields) = &mut draft {
            for (field, value) in patch {
                fields.insert(field.clone(), value.clone());
            }
        }
        self.autosave.update_draft(&key, &draft)
    }

    /// Replace the draft of an unbound widget
    ///
    /// # Errors
    /// Returns error if the widget does not exist or the draft is not JSON
    pub fn edit_widget_draft(&self, widget_id: &WidgetId, draft: &Value) -> EngineResult<DraftChange> {
        let widget = self
            .widgets
            .get_config(widget_id)
            .ok_or_else(|| EngineError::WidgetNotFound(widget_id.clone()))?;

        let key = EntityKey::draft(widget.widget_type, widget_id.clone());
        if !self.autosave.is_tracked(&key) {
            if let Some(stored) = self.plugin(widget.widget_type)?.get_draft(widget_id) {
                self.autosave.track(&key, &stored)?;
            }
        }
        self.autosave.update_draft(&key, draft)
    }

    /// Write pending edits for `key` now
    pub async fn save_now(&self, key: &EntityKey) -> SaveOutcome {
        self.autosave.force_save(key).await
    }

    /// Bind a widget to an item, or unbind with `None`
    ///
    /// # Errors
    /// Returns error if the widget or item does not exist
    pub fn bind_widget(&self, widget_id: &WidgetId, item_id: Option<ItemId>) -> EngineResult<ConfigChange> {
        self.widgets.bind_item(widget_id, item_id, &self.registry)
    }

    /// Render data for a widget
    ///
    /// `None` for an unknown widget, an unbound widget, or a dangling binding.
    #[must_use]
    pub fn widget_data(&self, widget_id: &WidgetId) -> Option<WidgetData> {
        let widget = self.widgets.get_config(widget_id)?;
        let plugin = self.registry.get_plugin(widget.widget_type)?;
        plugin.get_widget_data_for_binding(widget_id, widget.selected_item_id.as_ref())
    }

    /// Remove a widget along with its drafts and pending draft edits
    ///
    /// Draft cleanup is best-effort; failures are logged.
    pub fn remove_widget(&self, widget_id: &WidgetId) -> ConfigChange {
        let change = self.widgets.remove_config(widget_id);
        if change.is_failed() {
            return change;
        }

        for plugin in self.registry.get_all_plugins() {
            if let Err(err) = plugin.clear_draft(widget_id) {
                tracing::warn!(widget = %widget_id, item_type = %plugin.id(), error = %err, "draft not cleared");
            }
        }
        self.autosave
            .teardown_matching(|key| matches!(key, EntityKey::Draft { widget_id: w, .. } if w == widget_id));
        change
    }

    /// Write every dirty edit, then stop tracking
    pub async fn shutdown(&self) -> Vec<(EntityKey, SaveOutcome)> {
        let outcomes = self.autosave.flush_all().await;
        let closed = self.autosave.teardown_all();
        tracing::info!(closed, "planboard shut down");
        outcomes
    }
}
