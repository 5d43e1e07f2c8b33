use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One recognized food with the user's portion entry. Ephemeral between
/// analysis and save; a snapshot is serialized into `MealRecord::items_json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    /// Calories per 100 g as reported by the recognizer.
    pub calories: i64,
    /// Raw grams entry, digits only ("" until the user types something).
    #[serde(default)]
    pub grams: String,
}

/// Immutable saved meal. Assigned its id at insert time, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MealRecord {
    pub id: i64,
    /// Epoch milliseconds at save time.
    pub timestamp: i64,
    pub image_path: Option<String>,
    pub total_calories: i64,
    pub items_json: String,
}

/// Save-time input; the ledger assigns the id and computes nothing.
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub timestamp: i64,
    pub image_path: Option<String>,
    pub items: Vec<FoodItem>,
}

impl MealRecord {
    pub fn items(&self) -> Result<Vec<FoodItem>, serde_json::Error> {
        serde_json::from_str(&self.items_json)
    }
}
