use super::{Item, ItemMeta, ItemRecord};
use crate::item_type::ItemTypeId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const DEFAULT_CATEGORIES: [&str; 5] = ["Lodging", "Tickets", "Food", "Transport", "Souvenirs"];

/// Spending category with an allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetCategory {
    /// Category identifier, unique within the budget
    pub id: String,
    /// Display name
    pub name: String,
    /// Amount set aside
    #[serde(default)]
    pub allocated: f64,
}

/// Recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// Expense identifier
    pub id: String,
    /// Category the expense counts against
    pub category_id: String,
    /// What was bought
    #[serde(default)]
    pub description: String,
    /// Amount spent
    pub amount: f64,
    /// Day of purchase
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Trip budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    /// Shared metadata
    #[serde(flatten)]
    pub meta: ItemMeta,
    /// Total amount available
    #[serde(default)]
    pub total: f64,
    /// ISO currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Spending categories
    #[serde(default)]
    pub categories: Vec<BudgetCategory>,
    /// Recorded expenses
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl BudgetItem {
    /// Sum of all expenses
    #[must_use]
    pub fn spent(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }

    /// Total minus spent; negative when over budget
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> f64 {
        self.total - self.spent()
    }

    /// Sum of expenses recorded against one category
    #[must_use]
    pub fn spent_in(&self, category_id: &str) -> f64 {
        self.expenses
            .iter()
            .filter(|e| e.category_id == category_id)
            .map(|e| e.amount)
            .sum()
    }

    /// Sum of category allocations
    #[must_use]
    pub fn allocated(&self) -> f64 {
        self.categories.iter().map(|c| c.allocated).sum()
    }
}

impl ItemRecord for BudgetItem {
    const ITEM_TYPE: ItemTypeId = ItemTypeId::Budget;

    fn create_default(meta: ItemMeta) -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(|name| BudgetCategory {
                id: name.to_ascii_lowercase(),
                name: (*name).to_string(),
                allocated: 0.0,
            })
            .collect();
        Self {
            meta,
            total: 0.0,
            currency: default_currency(),
            categories,
            expenses: Vec::new(),
        }
    }

    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn render_payload(&self, _now: DateTime<Utc>) -> Value {
        let by_category: Vec<Value> = self
            .categories
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "name": c.name,
                    "allocated": c.allocated,
                    "spent": self.spent_in(&c.id),
                })
            })
            .collect();

        json!({
            "total": self.total,
            "currency": self.currency,
            "spent": self.spent(),
            "remaining": self.remaining(),
            "categories": by_category,
        })
    }

    fn into_item(self) -> Item {
        Item::Budget(self)
    }
}
