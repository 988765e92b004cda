//! Collection-backed item plugin
//!
//! [`CollectionPlugin`] implements [`ItemPlugin`] once for any
//! [`ItemRecord`]: items live in the type's collection, drafts in the type's
//! draft slot keyed by widget id.

use crate::config_manager::{ConfigChange, WidgetConfigManager};
use crate::error::{EngineError, EngineResult};
use crate::plugin::{ItemPlugin, WidgetComponent, WidgetData};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use planboard_core::{
    AccessTier, BudgetItem, CountdownItem, Item, ItemId, ItemMeta, ItemRecord, ItemTypeId,
    ItineraryItem, PackingItem, WidgetId,
};
use planboard_storage::UnifiedStorage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Keys a partial update may never overwrite
const PROTECTED_KEYS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Static description of a plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Human-readable name
    pub display_name: &'static str,
    /// Short description
    pub description: &'static str,
    /// Minimum tier
    pub required_tier: AccessTier,
    /// Rendering binding
    pub component: WidgetComponent,
}

/// Draft slot entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftEntry {
    id: WidgetId,
    draft: Value,
    updated_at: DateTime<Utc>,
}

/// Plugin storing items of type `T` in a shared collection
pub struct CollectionPlugin<T: ItemRecord> {
    info: PluginInfo,
    storage: Arc<UnifiedStorage>,
    widgets: Arc<WidgetConfigManager>,
    _record: PhantomData<fn() -> T>,
}

impl<T: ItemRecord> fmt::Debug for CollectionPlugin<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionPlugin")
            .field("item_type", &T::ITEM_TYPE)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl<T: ItemRecord> CollectionPlugin<T> {
    /// Create plugin over shared storage and widget configuration
    #[must_use]
    pub fn new(info: PluginInfo, storage: Arc<UnifiedStorage>, widgets: Arc<WidgetConfigManager>) -> Self {
        Self {
            info,
            storage,
            widgets,
            _record: PhantomData,
        }
    }

    /// Typed lookup
    #[must_use]
    pub fn get_record(&self, id: &ItemId) -> Option<T> {
        self.storage.find_item(Self::collection(), id.as_str())
    }

    /// Typed listing
    #[must_use]
    pub fn list_records(&self) -> Vec<T> {
        self.storage.get_collection(Self::collection())
    }

    #[inline]
    fn collection() -> &'static str {
        T::ITEM_TYPE.collection_name()
    }

    #[inline]
    fn draft_slot() -> &'static str {
        T::ITEM_TYPE.draft_slot_name()
    }
}

/// Merge `partial` into `record`, returning the merged record if anything changed
fn merge_partial<T: ItemRecord>(record: &T, partial: &serde_json::Map<String, Value>) -> EngineResult<Option<T>> {
    let Value::Object(mut fields) = serde_json::to_value(record)? else {
        return Err(EngineError::InvalidPartial(format!(
            "{} item does not serialize to an object",
            T::ITEM_TYPE
        )));
    };
    let before = fields.clone();

    for (key, value) in partial {
        if PROTECTED_KEYS.contains(&key.as_str()) {
            tracing::debug!(key = %key, "ignoring protected key in partial update");
            continue;
        }
        fields.insert(key.clone(), value.clone());
    }
    if fields == before {
        return Ok(None);
    }

    let mut merged: T = serde_json::from_value(Value::Object(fields))
        .map_err(|e| EngineError::InvalidPartial(e.to_string()))?;
    merged.meta_mut().touch(Utc::now());
    merged.meta().validate()?;
    Ok(Some(merged))
}

#[async_trait]
impl<T: ItemRecord> ItemPlugin for CollectionPlugin<T> {
    fn id(&self) -> ItemTypeId {
        T::ITEM_TYPE
    }

    fn display_name(&self) -> &str {
        self.info.display_name
    }

    fn description(&self) -> &str {
        self.info.description
    }

    fn required_tier(&self) -> AccessTier {
        self.info.required_tier
    }

    fn widget_component(&self) -> WidgetComponent {
        self.info.component
    }

    async fn create_default_item(&self, name: Option<&str>) -> EngineResult<ItemId> {
        let meta = ItemMeta::new(name, T::ITEM_TYPE.default_item_name(), Utc::now());
        let record = T::create_default(meta);
        let id = record.meta().id.clone();

        self.storage.add_item(Self::collection(), &record)?;
        tracing::info!(item_type = %T::ITEM_TYPE, item = %id, name = %record.meta().name, "item created");
        Ok(id)
    }

    fn get_item(&self, id: &ItemId) -> Option<Item> {
        self.get_record(id).map(ItemRecord::into_item)
    }

    fn list_items(&self) -> Vec<Item> {
        self.list_records().into_iter().map(ItemRecord::into_item).collect()
    }

    fn update_item(&self, id: &ItemId, partial: &Value) -> EngineResult<bool> {
        let Some(patch) = partial.as_object() else {
            return Err(EngineError::InvalidPartial("partial update must be a JSON object".into()));
        };

        let outcome = self
            .storage
            .modify_collection::<T, EngineResult<bool>, _>(Self::collection(), |records| {
                let Some(record) = records.iter_mut().find(|r| &r.meta().id == id) else {
                    return Ok(false);
                };
                if let Some(merged) = merge_partial(record, patch)? {
                    *record = merged;
                }
                Ok(true)
            })?;

        if matches!(outcome, Ok(false)) {
            tracing::debug!(item_type = %T::ITEM_TYPE, item = %id, "update for unknown item");
        }
        outcome
    }

    fn delete_item(&self, id: &ItemId) -> EngineResult<bool> {
        if let ConfigChange::Failed(source) = self.widgets.cleanup_deleted_item_references(id, T::ITEM_TYPE) {
            return Err(EngineError::ReferenceCleanup {
                item_type: T::ITEM_TYPE,
                id: id.clone(),
                source,
            });
        }

        let deleted = self.storage.delete_item(Self::collection(), id.as_str())?;
        if deleted {
            tracing::info!(item_type = %T::ITEM_TYPE, item = %id, "item deleted");
        }
        Ok(deleted)
    }

    fn clear_items(&self) -> EngineResult<()> {
        if let ConfigChange::Failed(source) = self.widgets.cleanup_all_item_references(T::ITEM_TYPE) {
            return Err(EngineError::ReferenceCleanup {
                item_type: T::ITEM_TYPE,
                id: ItemId::from("*"),
                source,
            });
        }
        self.storage.save_collection::<T>(Self::collection(), &[])?;
        tracing::info!(item_type = %T::ITEM_TYPE, "all items cleared");
        Ok(())
    }

    fn get_widget_data_for_binding(&self, widget_id: &WidgetId, item_id: Option<&ItemId>) -> Option<WidgetData> {
        let item_id = item_id?;
        let Some(record) = self.get_record(item_id) else {
            tracing::debug!(widget = %widget_id, item = %item_id, "bound item no longer exists");
            return None;
        };

        let meta = record.meta();
        Some(WidgetData {
            widget_id: widget_id.clone(),
            item_type: T::ITEM_TYPE,
            item_id: meta.id.clone(),
            name: meta.name.clone(),
            updated_at: meta.updated_at,
            payload: record.render_payload(Utc::now()),
        })
    }

    fn apply_draft_to_live_state(&self, widget_id: &WidgetId, draft: &Value) -> EngineResult<()> {
        let entry = DraftEntry {
            id: widget_id.clone(),
            draft: draft.clone(),
            updated_at: Utc::now(),
        };
        self.storage.upsert_item(Self::draft_slot(), widget_id.as_str(), &entry)?;
        tracing::debug!(item_type = %T::ITEM_TYPE, widget = %widget_id, "draft stored");
        Ok(())
    }

    fn get_draft(&self, widget_id: &WidgetId) -> Option<Value> {
        self.storage
            .find_item::<DraftEntry>(Self::draft_slot(), widget_id.as_str())
            .map(|entry| entry.draft)
    }

    fn clear_draft(&self, widget_id: &WidgetId) -> EngineResult<bool> {
        Ok(self.storage.delete_item(Self::draft_slot(), widget_id.as_str())?)
    }
}

/// The four built-in plugins
#[must_use]
pub fn builtin_plugins(
    storage: &Arc<UnifiedStorage>,
    widgets: &Arc<WidgetConfigManager>,
) -> Vec<Arc<dyn ItemPlugin>> {
    vec![
        Arc::new(CollectionPlugin::<CountdownItem>::new(
            PluginInfo {
                display_name: "Countdown",
                description: "Count down the days to your trip",
                required_tier: AccessTier::Anonymous,
                component: WidgetComponent::new("CountdownWidget"),
            },
            Arc::clone(storage),
            Arc::clone(widgets),
        )),
        Arc::new(CollectionPlugin::<BudgetItem>::new(
            PluginInfo {
                display_name: "Budget",
                description: "Track trip spending against a budget",
                required_tier: AccessTier::Standard,
                component: WidgetComponent::new("BudgetWidget"),
            },
            Arc::clone(storage),
            Arc::clone(widgets),
        )),
        Arc::new(CollectionPlugin::<PackingItem>::new(
            PluginInfo {
                display_name: "Packing List",
                description: "Check off what is already in the bag",
                required_tier: AccessTier::Standard,
                component: WidgetComponent::new("PackingWidget"),
            },
            Arc::clone(storage),
            Arc::clone(widgets),
        )),
        Arc::new(CollectionPlugin::<ItineraryItem>::new(
            PluginInfo {
                display_name: "Itinerary",
                description: "Plan each day of the trip",
                required_tier: AccessTier::Premium,
                component: WidgetComponent::new("ItineraryWidget"),
            },
            Arc::clone(storage),
            Arc::clone(widgets),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use planboard_core::{WidgetInstance, WidgetSize};
    use planboard_storage::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Fixture {
        storage: Arc<UnifiedStorage>,
        widgets: Arc<WidgetConfigManager>,
        plugin: CollectionPlugin<CountdownItem>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(UnifiedStorage::new(Arc::new(MemoryStore::new())));
        let widgets = Arc::new(WidgetConfigManager::new(Arc::clone(&storage)));
        let plugin = CollectionPlugin::new(
            PluginInfo {
                display_name: "Countdown",
                description: "test",
                required_tier: AccessTier::Anonymous,
                component: WidgetComponent::new("CountdownWidget"),
            },
            Arc::clone(&storage),
            Arc::clone(&widgets),
        );
        Fixture { storage, widgets, plugin }
    }

    #[tokio::test]
    async fn create_default_uses_type_name() {
        let fx = fixture();
        let id = fx.plugin.create_default_item(None).await.unwrap();

        let item = fx.plugin.get_item(&id).unwrap();
        assert_eq!(item.name(), ItemTypeId::Countdown.default_item_name());
        assert_eq!(item.item_type(), ItemTypeId::Countdown);
        assert_eq!(fx.plugin.list_items().len(), 1);
    }

    #[tokio::test]
    async fn update_merges_and_protects_identity() {
        let fx = fixture();
        let id = fx.plugin.create_default_item(Some("Trip")).await.unwrap();
        let before = fx.plugin.get_record(&id).unwrap();

        let partial = json!({
            "id": "hijacked",
            "createdAt": "2000-01-01T00:00:00Z",
            "name": "Disney Trip",
            "targetDate": "2030-06-01T00:00:00Z",
        });
        assert!(fx.plugin.update_item(&id, &partial).unwrap());

        let after = fx.plugin.get_record(&id).unwrap();
        assert_eq!(after.meta.id, id);
        assert_eq!(after.meta.created_at, before.meta.created_at);
        assert_eq!(after.meta.name, "Disney Trip");
        assert!(after.meta.updated_at >= before.meta.updated_at);
        assert_eq!(after.target_date.to_rfc3339(), "2030-06-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn update_unknown_item_returns_false() {
        let fx = fixture();
        assert!(!fx.plugin.update_item(&ItemId::from("ghost"), &json!({"name": "x"})).unwrap());
    }

    #[tokio::test]
    async fn invalid_partial_leaves_item_alone() {
        let fx = fixture();
        let id = fx.plugin.create_default_item(Some("Trip")).await.unwrap();
        let before = fx.plugin.get_record(&id).unwrap();

        let err = fx.plugin.update_item(&id, &json!({"targetDate": 12})).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPartial(_)));

        let err = fx.plugin.update_item(&id, &json!({"name": "  "})).unwrap_err();
        assert!(matches!(err, EngineError::InvalidItem(_)));

        assert_eq!(fx.plugin.get_record(&id).unwrap(), before);
    }

    #[tokio::test]
    async fn delete_unbinds_widgets_first() {
        let fx = fixture();
        let id = fx.plugin.create_default_item(Some("Trip")).await.unwrap();
        let widget = WidgetInstance::new(ItemTypeId::Countdown, WidgetSize::Medium)
            .with_id("w1")
            .with_selected_item(id.clone());
        assert!(fx.widgets.add_config(widget).is_applied());

        assert!(fx.plugin.delete_item(&id).unwrap());
        assert!(fx.plugin.get_item(&id).is_none());
        assert!(fx.widgets.get_config(&WidgetId::from("w1")).unwrap().selected_item_id.is_none());

        assert!(!fx.plugin.delete_item(&id).unwrap());
    }

    #[tokio::test]
    async fn clear_items_unbinds_everything() {
        let fx = fixture();
        let a = fx.plugin.create_default_item(Some("A")).await.unwrap();
        let _b = fx.plugin.create_default_item(Some("B")).await.unwrap();
        let widget = WidgetInstance::new(ItemTypeId::Countdown, WidgetSize::Small)
            .with_id("w1")
            .with_selected_item(a);
        assert!(fx.widgets.add_config(widget).is_applied());

        fx.plugin.clear_items().unwrap();
        assert!(fx.plugin.list_items().is_empty());
        assert!(fx.widgets.get_configs()[0].selected_item_id.is_none());
    }

    #[tokio::test]
    async fn binding_data_for_missing_item_is_none() {
        let fx = fixture();
        let widget = WidgetId::from("w1");
        assert!(fx.plugin.get_widget_data_for_binding(&widget, None).is_none());
        assert!(fx
            .plugin
            .get_widget_data_for_binding(&widget, Some(&ItemId::from("gone")))
            .is_none());

        let id = fx.plugin.create_default_item(Some("Trip")).await.unwrap();
        let data = fx.plugin.get_widget_data_for_binding(&widget, Some(&id)).unwrap();
        assert_eq!(data.name, "Trip");
        assert_eq!(data.item_type, ItemTypeId::Countdown);
        assert_eq!(data.payload["remaining"]["elapsed"], json!(false));
    }

    #[test]
    fn drafts_are_keyed_by_widget() {
        let fx = fixture();
        let w1 = WidgetId::from("w1");
        let w2 = WidgetId::from("w2");

        fx.plugin.apply_draft_to_live_state(&w1, &json!({"name": "one"})).unwrap();
        fx.plugin.apply_draft_to_live_state(&w2, &json!({"name": "two"})).unwrap();
        fx.plugin.apply_draft_to_live_state(&w1, &json!({"name": "uno"})).unwrap();

        assert_eq!(fx.plugin.get_draft(&w1), Some(json!({"name": "uno"})));
        assert_eq!(fx.plugin.get_draft(&w2), Some(json!({"name": "two"})));
        assert_eq!(
            fx.storage
                .get_collection::<Value>(ItemTypeId::Countdown.draft_slot_name())
                .len(),
            2
        );

        assert!(fx.plugin.clear_draft(&w1).unwrap());
        assert!(fx.plugin.get_draft(&w1).is_none());
        assert!(!fx.plugin.clear_draft(&w1).unwrap());
    }

    #[test]
    fn builtins_cover_every_type() {
        let fx = fixture();
        let plugins = builtin_plugins(&fx.storage, &fx.widgets);
        let ids: Vec<ItemTypeId> = plugins.iter().map(|p| p.id()).collect();
        assert_eq!(ids, ItemTypeId::ALL.to_vec());
        assert_eq!(plugins[3].required_tier(), AccessTier::Premium);
    }
}
