//! Widget configuration manager
//!
//! Owns the ordered list of widget instances, persisted as the
//! `widget-configs` collection.
//!
//! # Invariants
//! - `order` values are always a dense `0..n-1` sequence
//! - `selected_item_id`, when set, names an existing item of the widget's type;
//!   only [`WidgetConfigManager::bind_item`] changes it on a stored widget
//!
//! Every mutation reports a [`ConfigChange`] instead of failing: a lost
//! layout change is recoverable, a crashed dashboard is not.

use crate::error::{EngineError, EngineResult, ReorderError};
use crate::registry::PluginRegistry;
use planboard_core::{
    ItemId, ItemTypeId, WidgetId, WidgetInstance, WidgetPatch, WidgetSize, WIDGET_CONFIGS,
};
use planboard_storage::{StorageError, UnifiedStorage};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a configuration mutation
#[derive(Debug)]
#[must_use]
pub enum ConfigChange {
    /// Change persisted
    Applied,
    /// Nothing to do (unknown id, duplicate, or no difference)
    Unchanged,
    /// Storage rejected the write; previous configuration kept
    Failed(StorageError),
}

impl ConfigChange {
    /// Check if the change was persisted
    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Check if storage rejected the change
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Manager for the widget layout
#[derive(Debug)]
pub struct WidgetConfigManager {
    storage: Arc<UnifiedStorage>,
}

impl WidgetConfigManager {
    /// Create manager over shared storage
    #[inline]
    #[must_use]
    pub fn new(storage: Arc<UnifiedStorage>) -> Self {
        Self { storage }
    }

    /// All widgets, ordered by `order`
    #[must_use]
    pub fn get_configs(&self) -> Vec<WidgetInstance> {
        let mut widgets: Vec<WidgetInstance> = self.storage.get_collection(WIDGET_CONFIGS);
        widgets.sort_by_key(|w| w.order);
        widgets
    }

    /// Look up one widget
    #[must_use]
    pub fn get_config(&self, id: &WidgetId) -> Option<WidgetInstance> {
        self.storage.find_item(WIDGET_CONFIGS, id.as_str())
    }

    /// Append a widget at the end
    ///
    /// The caller's `order` is ignored. A widget whose id already exists is
    /// not added again. The instance is stored as given, binding included;
    /// this is the path for restoring a saved layout, so the binding is not
    /// checked against the plugins.
    pub fn add_config(&self, mut instance: WidgetInstance) -> ConfigChange {
        let id = instance.id.clone();
        let change = self.mutate("add", |widgets| {
            if widgets.iter().any(|w| w.id == instance.id) {
                tracing::debug!(widget = %instance.id, "widget already configured");
                return false;
            }
            instance.order = dense_index(widgets.len());
            widgets.push(instance);
            true
        });
        if change.is_applied() {
            tracing::info!(widget = %id, "widget added");
        }
        change
    }

    /// Create, append, and return a fresh unbound widget
    ///
    /// # Returns
    /// `None` if storage rejected the write
    pub fn create_widget(&self, widget_type: ItemTypeId, size: WidgetSize) -> Option<WidgetInstance> {
        let instance = WidgetInstance::new(widget_type, size);
        let id = instance.id.clone();
        match self.add_config(instance) {
            ConfigChange::Applied => self.get_config(&id),
            ConfigChange::Unchanged | ConfigChange::Failed(_) => None,
        }
    }

    /// Merge `patch` into a widget
    ///
    /// A binding in `patch` is ignored; use [`Self::bind_item`], which checks
    /// the item exists.
    pub fn update_config(&self, id: &WidgetId, patch: &WidgetPatch) -> ConfigChange {
        if patch.selected_item_id.is_some() {
            tracing::debug!(widget = %id, "ignoring binding in widget patch");
        }
        let patch = WidgetPatch {
            selected_item_id: None,
            ..patch.clone()
        };
        self.apply_patch(id, &patch)
    }

    fn apply_patch(&self, id: &WidgetId, patch: &WidgetPatch) -> ConfigChange {
        self.mutate("update", |widgets| {
            widgets
                .iter_mut()
                .find(|w| &w.id == id)
                .is_some_and(|w| patch.apply(w))
        })
    }

    /// Remove a widget and close the gap it leaves in `order`
    pub fn remove_config(&self, id: &WidgetId) -> ConfigChange {
        let change = self.mutate("remove", |widgets| {
            let before = widgets.len();
            widgets.retain(|w| &w.id != id);
            if widgets.len() == before {
                return false;
            }
            densify(widgets);
            true
        });
        if change.is_applied() {
            tracing::info!(widget = %id, "widget removed");
        }
        change
    }

    /// Rewrite every widget's `order` to its index in `new_order`
    ///
    /// # Errors
    /// Returns [`ReorderError`] unless `new_order` names every configured
    /// widget exactly once; nothing is written in that case.
    pub fn reorder_widgets(&self, new_order: &[WidgetId]) -> Result<ConfigChange, ReorderError> {
        let mut rejected = None;
        let change = self.mutate("reorder", |widgets| {
            if let Err(err) = validate_permutation(widgets, new_order) {
                rejected = Some(err);
                return false;
            }
            for widget in widgets.iter_mut() {
                if let Some(pos) = new_order.iter().position(|id| id == &widget.id) {
                    widget.order = dense_index(pos);
                }
            }
            widgets.sort_by_key(|w| w.order);
            true
        });

        match rejected {
            Some(err) => {
                tracing::warn!(error = %err, "rejected widget reorder");
                Err(err)
            }
            None => Ok(change),
        }
    }

    /// Bind a widget to an item, or unbind with `None`
    ///
    /// # Errors
    /// - `EngineError::WidgetNotFound` if the widget does not exist
    /// - `EngineError::UnknownPlugin` if no plugin serves the widget's type
    /// - `EngineError::ItemNotFound` if the item is not of the widget's type
    pub fn bind_item(
        &self,
        widget_id: &WidgetId,
        item_id: Option<ItemId>,
        registry: &PluginRegistry,
    ) -> EngineResult<ConfigChange> {
        let widget = self
            .get_config(widget_id)
            .ok_or_else(|| EngineError::WidgetNotFound(widget_id.clone()))?;

        if let Some(item_id) = &item_id {
            let plugin = registry
                .get_plugin(widget.widget_type)
                .ok_or(EngineError::UnknownPlugin(widget.widget_type))?;
            if plugin.get_item(item_id).is_none() {
                return Err(EngineError::item_not_found(widget.widget_type, item_id.clone()));
            }
        }

        Ok(self.apply_patch(widget_id, &WidgetPatch::bind(item_id)))
    }

    /// Widgets currently showing `item_id`
    #[must_use]
    pub fn widgets_bound_to(&self, item_type: ItemTypeId, item_id: &ItemId) -> Vec<WidgetInstance> {
        self.get_configs()
            .into_iter()
            .filter(|w| w.widget_type == item_type && w.selected_item_id.as_ref() == Some(item_id))
            .collect()
    }

    /// Unbind every widget of `item_type` that shows `item_id`
    pub fn cleanup_deleted_item_references(&self, item_id: &ItemId, item_type: ItemTypeId) -> ConfigChange {
        self.sweep(item_type, |selected| selected == item_id)
    }

    /// Unbind every widget of `item_type`
    pub fn cleanup_all_item_references(&self, item_type: ItemTypeId) -> ConfigChange {
        self.sweep(item_type, |_| true)
    }

    fn sweep(&self, item_type: ItemTypeId, matches: impl Fn(&ItemId) -> bool) -> ConfigChange {
        let mut cleared = 0usize;
        let change = self.mutate("sweep", |widgets| {
            for widget in widgets.iter_mut().filter(|w| w.widget_type == item_type) {
                if widget.selected_item_id.as_ref().is_some_and(&matches) {
                    widget.selected_item_id = None;
                    cleared += 1;
                }
            }
            cleared > 0
        });
        if change.is_applied() {
            tracing::info!(%item_type, cleared, "cleared widget item references");
        }
        change
    }

    fn mutate(&self, op: &'static str, f: impl FnOnce(&mut Vec<WidgetInstance>) -> bool) -> ConfigChange {
        let result = self
            .storage
            .modify_collection::<WidgetInstance, bool, _>(WIDGET_CONFIGS, |widgets| {
                // Layouts written elsewhere may carry gaps or duplicates
                widgets.sort_by_key(|w| w.order);
                densify(widgets);
                f(widgets)
            });

        match result {
            Ok(true) => ConfigChange::Applied,
            Ok(false) => ConfigChange::Unchanged,
            Err(err) => {
                tracing::warn!(op, error = %err, "widget configuration not saved");
                ConfigChange::Failed(err)
            }
        }
    }
}

fn dense_index(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

fn densify(widgets: &mut [WidgetInstance]) {
    for (index, widget) in widgets.iter_mut().enumerate() {
        widget.order = dense_index(index);
    }
}

fn validate_permutation(widgets: &[WidgetInstance], new_order: &[WidgetId]) -> Result<(), ReorderError> {
    let existing: HashSet<&WidgetId> = widgets.iter().map(|w| &w.id).collect();
    let mut seen = HashSet::with_capacity(new_order.len());

    for id in new_order {
        if !existing.contains(id) {
            return Err(ReorderError::Unknown(id.clone()));
        }
        if !seen.insert(id) {
            return Err(ReorderError::Duplicate(id.clone()));
        }
    }

    let missing: Vec<WidgetId> = widgets
        .iter()
        .filter(|w| !seen.contains(&w.id))
        .map(|w| w.id.clone())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReorderError::Missing(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planboard_storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn manager() -> WidgetConfigManager {
        WidgetConfigManager::new(Arc::new(UnifiedStorage::new(Arc::new(MemoryStore::new()))))
    }

    fn widget(id: &str) -> WidgetInstance {
        WidgetInstance::new(ItemTypeId::Countdown, WidgetSize::Medium).with_id(id)
    }

    fn ids_and_orders(manager: &WidgetConfigManager) -> Vec<(String, u32)> {
        manager
            .get_configs()
            .into_iter()
            .map(|w| (w.id.to_string(), w.order))
            .collect()
    }

    #[test]
    fn add_assigns_order_at_end() {
        let manager = manager();
        let mut first = widget("a");
        first.order = 42;

        assert!(manager.add_config(first).is_applied());
        assert!(manager.add_config(widget("b")).is_applied());

        assert_eq!(ids_and_orders(&manager), vec![("a".into(), 0), ("b".into(), 1)]);
    }

    #[test]
    fn duplicate_add_is_unchanged() {
        let manager = manager();
        assert!(manager.add_config(widget("a")).is_applied());
        assert!(matches!(manager.add_config(widget("a")), ConfigChange::Unchanged));
        assert_eq!(manager.get_configs().len(), 1);
    }

    #[test]
    fn remove_middle_densifies() {
        let manager = manager();
        for id in ["a", "b", "c"] {
            assert!(manager.add_config(widget(id)).is_applied());
        }

        assert!(manager.remove_config(&WidgetId::from("b")).is_applied());
        assert_eq!(ids_and_orders(&manager), vec![("a".into(), 0), ("c".into(), 1)]);
    }

    #[test]
    fn remove_unknown_is_unchanged() {
        let manager = manager();
        assert!(manager.add_config(widget("a")).is_applied());
        assert!(matches!(
            manager.remove_config(&WidgetId::from("zzz")),
            ConfigChange::Unchanged
        ));
    }

    #[test]
    fn reorder_rewrites_orders() {
        let manager = manager();
        for id in ["a", "b", "c"] {
            assert!(manager.add_config(widget(id)).is_applied());
        }

        let order = [WidgetId::from("c"), WidgetId::from("a"), WidgetId::from("b")];
        assert!(manager.reorder_widgets(&order).unwrap().is_applied());
        assert_eq!(
            ids_and_orders(&manager),
            vec![("c".into(), 0), ("a".into(), 1), ("b".into(), 2)]
        );
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let manager = manager();
        for id in ["a", "b"] {
            assert!(manager.add_config(widget(id)).is_applied());
        }

        let dup = [WidgetId::from("a"), WidgetId::from("a")];
        assert_eq!(
            manager.reorder_widgets(&dup).unwrap_err(),
            ReorderError::Duplicate(WidgetId::from("a"))
        );

        let unknown = [WidgetId::from("a"), WidgetId::from("x")];
        assert_eq!(
            manager.reorder_widgets(&unknown).unwrap_err(),
            ReorderError::Unknown(WidgetId::from("x"))
        );

        let partial = [WidgetId::from("b")];
        assert_eq!(
            manager.reorder_widgets(&partial).unwrap_err(),
            ReorderError::Missing(vec![WidgetId::from("a")])
        );

        // Untouched
        assert_eq!(ids_and_orders(&manager), vec![("a".into(), 0), ("b".into(), 1)]);
    }

    #[test]
    fn update_config_cannot_touch_order() {
        let manager = manager();
        assert!(manager.add_config(widget("a")).is_applied());

        let patch = WidgetPatch::default().with_size(WidgetSize::Full);
        assert!(manager.update_config(&WidgetId::from("a"), &patch).is_applied());

        let stored = manager.get_config(&WidgetId::from("a")).unwrap();
        assert_eq!(stored.size, WidgetSize::Full);
        assert_eq!(stored.order, 0);

        assert!(matches!(
            manager.update_config(&WidgetId::from("nope"), &patch),
            ConfigChange::Unchanged
        ));
    }

    #[test]
    fn update_config_leaves_binding_alone() {
        let manager = manager();
        assert!(manager.add_config(widget("a")).is_applied());

        let patch = WidgetPatch::bind(Some(ItemId::from("anything")));
        assert!(matches!(
            manager.update_config(&WidgetId::from("a"), &patch),
            ConfigChange::Unchanged
        ));
        assert!(manager.get_config(&WidgetId::from("a")).unwrap().selected_item_id.is_none());
    }

    fn seed(storage: &UnifiedStorage, orders: &[u32]) {
        let widgets: Vec<WidgetInstance> = orders
            .iter()
            .enumerate()
            .map(|(i, order)| {
                let mut w = widget(&format!("s{i}"));
                w.order = *order;
                w
            })
            .collect();
        storage.save_collection(WIDGET_CONFIGS, &widgets).unwrap();
    }

    #[test]
    fn add_repairs_gapped_layout() {
        let storage = Arc::new(UnifiedStorage::new(Arc::new(MemoryStore::new())));
        seed(&storage, &[0, 5]);
        let manager = WidgetConfigManager::new(Arc::clone(&storage));

        assert!(manager.add_config(widget("c")).is_applied());
        assert_eq!(
            ids_and_orders(&manager),
            vec![("s0".into(), 0), ("s1".into(), 1), ("c".into(), 2)]
        );
    }

    #[test]
    fn sweep_clears_only_matching_type_and_id() {
        let manager = manager();
        let target = ItemId::from("item-1");
        let other = ItemId::from("item-2");

        assert!(manager.add_config(widget("a").with_selected_item(target.clone())).is_applied());
        assert!(manager.add_config(widget("b").with_selected_item(other.clone())).is_applied());
        let budget = WidgetInstance::new(ItemTypeId::Budget, WidgetSize::Small)
            .with_id("c")
            .with_selected_item(target.clone());
        assert!(manager.add_config(budget).is_applied());

        assert_eq!(manager.widgets_bound_to(ItemTypeId::Countdown, &target).len(), 1);
        assert!(manager
            .cleanup_deleted_item_references(&target, ItemTypeId::Countdown)
            .is_applied());

        assert!(manager.get_config(&WidgetId::from("a")).unwrap().selected_item_id.is_none());
        assert_eq!(manager.get_config(&WidgetId::from("b")).unwrap().selected_item_id, Some(other));
        assert_eq!(manager.get_config(&WidgetId::from("c")).unwrap().selected_item_id, Some(target.clone()));

        // Second sweep has nothing left to do
        assert!(matches!(
            manager.cleanup_deleted_item_references(&target, ItemTypeId::Countdown),
            ConfigChange::Unchanged
        ));
    }

    #[test]
    fn sweep_all_for_type() {
        let manager = manager();
        assert!(manager.add_config(widget("a").with_selected_item(ItemId::from("1"))).is_applied());
        assert!(manager.add_config(widget("b").with_selected_item(ItemId::from("2"))).is_applied());

        assert!(manager.cleanup_all_item_references(ItemTypeId::Countdown).is_applied());
        assert!(manager.get_configs().iter().all(|w| w.selected_item_id.is_none()));
    }

    #[test]
    fn quota_failure_keeps_previous_layout() {
        let store = Arc::new(MemoryStore::with_quota(200));
        let manager = WidgetConfigManager::new(Arc::new(UnifiedStorage::new(store)));
        assert!(manager.add_config(widget("a")).is_applied());

        let mut bulky = widget("b");
        bulky.settings.insert("blob".into(), serde_json::json!("x".repeat(500)));
        assert!(manager.add_config(bulky).is_failed());

        assert_eq!(ids_and_orders(&manager), vec![("a".into(), 0)]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Add), (0usize..16).prop_map(Op::Remove)]
    }

    proptest! {
        #[test]
        fn prop_orders_stay_dense(
            seeded in proptest::collection::vec(0u32..20, 0..6),
            ops in proptest::collection::vec(op(), 0..40),
        ) {
            let storage = Arc::new(UnifiedStorage::new(Arc::new(MemoryStore::new())));
            seed(&storage, &seeded);
            let manager = WidgetConfigManager::new(Arc::clone(&storage));
            let mut next = 0u32;

            for op in ops {
                match op {
                    Op::Add => {
                        let _ = manager.add_config(widget(&format!("w{next}")));
                        next += 1;
                    }
                    Op::Remove(pick) => {
                        let configs = manager.get_configs();
                        if !configs.is_empty() {
                            let id = configs[pick % configs.len()].id.clone();
                            let _ = manager.remove_config(&id);
                        }
                    }
                }

                let orders: Vec<u32> = manager.get_configs().iter().map(|w| w.order).collect();
                let expected: Vec<u32> = (0..dense_index(orders.len())).collect();
                prop_assert_eq!(orders, expected);
            }
        }
    }
}
