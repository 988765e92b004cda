use super::{Item, ItemMeta, ItemRecord};
use crate::countdown::{diff, CountdownParts};
use crate::item_type::ItemTypeId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Days between creation and the default countdown target
const DEFAULT_LEAD_DAYS: i64 = 30;

/// Reference to the park a trip is headed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkRef {
    /// Park identifier
    pub id: String,
    /// Park display name
    pub name: String,
}

/// Countdown display preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountdownSettings {
    /// Show the seconds unit
    pub show_seconds: bool,
    /// Show the milliseconds unit
    pub show_milliseconds: bool,
    /// Visual theme name
    pub theme: String,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            show_seconds: true,
            show_milliseconds: false,
            theme: "classic".to_string(),
        }
    }
}

/// Countdown to a trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownItem {
    /// Shared metadata
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Instant the countdown runs to
    pub target_date: DateTime<Utc>,
    /// Destination park
    #[serde(default)]
    pub park: Option<ParkRef>,
    /// Display preferences
    #[serde(default)]
    pub settings: CountdownSettings,
}

impl CountdownItem {
    /// Time remaining at `now`
    #[inline]
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> CountdownParts {
        diff(self.target_date, now)
    }
}

impl ItemRecord for CountdownItem {
    const ITEM_TYPE: ItemTypeId = ItemTypeId::Countdown;

    fn create_default(meta: ItemMeta) -> Self {
        let target_date = meta.created_at + Duration::days(DEFAULT_LEAD_DAYS);
        Self {
            meta,
            target_date,
            park: None,
            settings: CountdownSettings::default(),
        }
    }

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn render_payload(&self, now: DateTime<Utc>) -> Value {
        json!({
            "targetDate": self.target_date,
            "park": self.park,
            "settings": self.settings,
            "remaining": self.remaining(now),
        })
    }

    fn into_item(self) -> Item {
        Item::Countdown(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_targets_thirty_days_out() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let item = CountdownItem::create_default(ItemMeta::new(None, "My Countdown", now));
        assert_eq!(item.remaining(now).days, 30);
        assert!(item.settings.show_seconds);
    }

    #[test]
    fn serializes_flat_camel_case() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let item = CountdownItem::create_default(ItemMeta::new(Some("Trip"), "x", now));
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["name"], "Trip");
        assert!(json.get("targetDate").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("meta").is_none());
    }

    #[test]
    fn missing_settings_take_defaults() {
        let json = json!({
            "id": "c1",
            "name": "Trip",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z",
            "targetDate": "2026-02-01T00:00:00Z"
        });
        let item: CountdownItem = serde_json::from_value(json).unwrap();
        assert_eq!(item.settings, CountdownSettings::default());
        assert!(item.park.is_none());
    }

    #[test]
    fn payload_contains_remaining_parts() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let item = CountdownItem::create_default(ItemMeta::new(None, "x", now));
        let payload = item.render_payload(now);
        assert_eq!(payload["remaining"]["days"], 30);
        assert_eq!(payload["remaining"]["elapsed"], false);
    }
}
