use super::{Item, ItemMeta, ItemRecord};
use crate::item_type::ItemTypeId;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Scheduled activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryEntry {
    /// Entry identifier
    pub id: String,
    /// Start time, if scheduled
    #[serde(default)]
    pub time: Option<NaiveTime>,
    /// What happens
    pub title: String,
    /// Where it happens
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub notes: Option<String>,
}

/// One day of the trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryDay {
    /// Calendar day
    pub date: NaiveDate,
    /// Activities, in display order
    #[serde(default)]
    pub entries: Vec<ItineraryEntry>,
}

/// Day-by-day trip plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryItem {
    /// Shared metadata
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// First day of the trip
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Last day of the trip
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Planned days
    #[serde(default)]
    pub days: Vec<ItineraryDay>,
}

impl ItineraryItem {
    /// Total scheduled activities
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.days.iter().map(|d| d.entries.len()).sum()
    }

    /// Plan for a given day
    #[must_use]
    pub fn day(&self, date: NaiveDate) -> Option<&ItineraryDay> {
        self.days.iter().find(|d| d.date == date)
    }

    /// First planned day on or after `today`
    #[must_use]
    pub fn next_day(&self, today: NaiveDate) -> Option<&ItineraryDay> {
        self.days
            .iter()
            .filter(|d| d.date >= today)
            .min_by_key(|d| d.date)
    }
}

impl ItemRecord for ItineraryItem {
    const ITEM_TYPE: ItemTypeId = ItemTypeId::Itinerary;

    fn create_default(meta: ItemMeta) -> Self {
        Self {
            meta,
            start_date: None,
            end_date: None,
            days: Vec::new(),
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
            "startDate": self.start_date,
            "endDate": self.end_date,
            "dayCount": self.days.len(),
            "entryCount": self.entry_count(),
            "nextDay": self.next_day(now.date_naive()),
        })
    }

    fn into_item(self) -> Item {
        Item::Itinerary(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan() -> ItineraryItem {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let mut item = ItineraryItem::create_default(ItemMeta::new(None, "My Itinerary", now));
        item.days = serde_json::from_value(json!([
            {"date": "2026-06-10", "entries": [
                {"id": "a", "title": "Rope drop", "time": "08:00:00"},
                {"id": "b", "title": "Lunch", "location": "Main St"}
            ]},
            {"date": "2026-06-11", "entries": [{"id": "c", "title": "Fireworks"}]}
        ]))
        .unwrap();
        item
    }

    #[test]
    fn counts_entries_across_days() {
        assert_eq!(plan().entry_count(), 3);
    }

    #[test]
    fn next_day_skips_past_days() {
        let item = plan();
        let today = NaiveDate::from_ymd_opt(2026, 6, 11).unwrap();
        assert_eq!(item.next_day(today).unwrap().entries[0].title, "Fireworks");

        let after = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert!(item.next_day(after).is_none());
    }

    #[test]
    fn payload_summarizes_plan() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let payload = plan().render_payload(now);
        assert_eq!(payload["dayCount"], 2);
        assert_eq!(payload["entryCount"], 3);
        assert_eq!(payload["nextDay"]["date"], "2026-06-10");
    }
}
