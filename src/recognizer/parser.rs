//! Shapes the recognizer's free-text answer into food items.
//!
//! The canonical shape is the JSON array the prompt asks for, optionally
//! wrapped in Markdown code fences. Older model revisions answered with
//! line-oriented `Name — Calories` text instead; that shape is kept as a
//! legacy fallback and only consulted when the cleaned answer does not look
//! like a JSON array.

use serde::Deserialize;
use tracing::warn;

use crate::meals::FoodItem;

/// One entry of the legacy line-oriented shape. The calorie field is kept as
/// free text; the model sometimes appends units or ranges there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub calories: String,
}

#[derive(Debug, Deserialize)]
struct JsonItem {
    name: String,
    calories: i64,
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Strict parse of the canonical JSON-array shape. All-or-nothing: a single
/// malformed entry fails the whole answer.
pub fn parse_json_items(text: &str) -> Result<Vec<FoodItem>, serde_json::Error> {
    let items: Vec<JsonItem> = serde_json::from_str(text)?;
    Ok(items
        .into_iter()
        .map(|item| FoodItem {
            name: item.name,
            calories: item.calories,
            grams: String::new(),
        })
        .collect())
}

/// Tolerant parse of the legacy line shape. Bullet markers are removed,
/// plain dashes are normalized to em-dashes, and lines without a separator
/// are dropped. Source order is preserved; names are not deduplicated.
pub fn parse_lines(text: &str) -> Vec<LineItem> {
    let mut items = Vec::new();
    for line in text.split('\n') {
        let clean = line.replace('*', "").replace('-', "—");
        let clean = clean.trim();
        if let Some((name, calories)) = clean.split_once('—') {
            let name = name.trim();
            if !name.is_empty() {
                items.push(LineItem {
                    name: name.to_string(),
                    calories: calories.trim().to_string(),
                });
            }
        }
    }
    items
}

fn leading_int(text: &str) -> i64 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Entry point used by the analyze flow: canonical JSON first, legacy line
/// shape otherwise. Failures never propagate; an unusable answer is an empty
/// list and the user re-triggers the analysis.
pub fn parse_food_response(text: &str) -> Vec<FoodItem> {
    let clean = strip_fences(text);
    if clean.starts_with('[') {
        match parse_json_items(&clean) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "recognizer answer was not a valid item array");
                Vec::new()
            }
        }
    } else {
        parse_lines(&clean)
            .into_iter()
            .map(|item| FoodItem {
                calories: leading_int(&item.calories),
                name: item.name,
                grams: String::new(),
            })
            .collect()
    }
}
