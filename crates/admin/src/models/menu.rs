//! Menu items and today's selection.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use jmd_tiffins_core::{MealCategory, MenuItemId, Money};

/// A dish offered on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub date: NaiveDate,
    pub title: String,
    pub category: MealCategory,
    pub price: Money,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MenuItem {
    /// Label used in order pickers, e.g. `Veg Thali (2024-03-01) - ₹120.00`.
    #[must_use]
    pub fn picker_label(&self) -> String {
        format!("{} ({}) - {}", self.title, self.date, self.price)
    }
}

/// Fields accepted when creating or editing a menu item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemInput {
    pub date: NaiveDate,
    pub title: String,
    pub category: MealCategory,
    pub price: Money,
    pub description: Option<String>,
}

/// Group items by meal category in serving order, dropping empty groups.
#[must_use]
pub fn group_by_category(items: Vec<MenuItem>) -> Vec<(MealCategory, Vec<MenuItem>)> {
    MealCategory::ALL
        .iter()
        .map(|category| {
            let group: Vec<MenuItem> = items
                .iter()
                .filter(|item| item.category == *category)
                .cloned()
                .collect();
            (*category, group)
        })
        .filter(|(_, group)| !group.is_empty())
        .collect()
}
