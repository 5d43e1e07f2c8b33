//! Per-invocation interaction state for the analyze flow.
//!
//! Mirrors the screen lifecycle: Idle (no image) → Captured (image, no
//! analysis) → Analyzed (editable grams) → Saved (terminal). Navigation is
//! forward-only; re-capturing or re-analyzing replaces the current step's
//! data instead of stacking a new state.

use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::meals::services;
use crate::meals::{FoodItem, NewMeal};

#[derive(Debug)]
pub enum MealSession {
    Idle,
    Captured {
        image_path: PathBuf,
    },
    Analyzed {
        image_path: PathBuf,
        items: Vec<FoodItem>,
    },
    Saved {
        meal_id: i64,
    },
}

impl Default for MealSession {
    fn default() -> Self {
        Self::Idle
    }
}

impl MealSession {
    pub fn new() -> Self {
        Self::Idle
    }

    /// Attaches (or replaces) the photo. Any previous analysis is discarded,
    /// exactly as retaking the picture would on screen.
    pub fn attach_photo(&mut self, path: PathBuf) -> Result<(), AppError> {
        match self {
            Self::Saved { .. } => Err(AppError::SessionState("attaching a photo")),
            _ => {
                *self = Self::Captured { image_path: path };
                Ok(())
            }
        }
    }

    /// Records the recognizer's item list. Requires a captured photo.
    pub fn set_analysis(&mut self, items: Vec<FoodItem>) -> Result<(), AppError> {
        match std::mem::take(self) {
            Self::Captured { image_path } | Self::Analyzed { image_path, .. } => {
                *self = Self::Analyzed { image_path, items };
                Ok(())
            }
            other => {
                *self = other;
                Err(AppError::SessionState("analysis"))
            }
        }
    }

    /// Applies a grams edit to one item, keeping only digit characters.
    /// Edits beyond the item list are ignored; totals reflect the new entry
    /// immediately via `total`.
    pub fn set_grams(&mut self, index: usize, raw: &str) -> Result<(), AppError> {
        let Self::Analyzed { items, .. } = self else {
            return Err(AppError::SessionState("grams entry"));
        };
        if let Some(item) = items.get_mut(index) {
            item.grams = raw.chars().filter(char::is_ascii_digit).collect();
        }
        Ok(())
    }

    /// Name-addressed grams edit (first case-insensitive match). Returns
    /// whether any item matched.
    pub fn set_grams_by_name(&mut self, name: &str, raw: &str) -> Result<bool, AppError> {
        let Self::Analyzed { items, .. } = self else {
            return Err(AppError::SessionState("grams entry"));
        };
        match items
            .iter()
            .position(|item| item.name.eq_ignore_ascii_case(name))
        {
            Some(index) => {
                self.set_grams(index, raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn image_path(&self) -> Option<&Path> {
        match self {
            Self::Captured { image_path } | Self::Analyzed { image_path, .. } => {
                Some(image_path.as_path())
            }
            _ => None,
        }
    }

    pub fn items(&self) -> &[FoodItem] {
        match self {
            Self::Analyzed { items, .. } => items,
            _ => &[],
        }
    }

    pub fn total(&self) -> f64 {
        services::total_calories(self.items())
    }

    /// Snapshot of the session as save-time input. Validation of image and
    /// item presence belongs to the ledger, not here.
    pub fn finish(&self, timestamp_ms: i64) -> Result<NewMeal, AppError> {
        let Self::Analyzed { image_path, items } = self else {
            return Err(AppError::SessionState("saving"));
        };
        Ok(NewMeal {
            timestamp: timestamp_ms,
            image_path: Some(image_path.display().to_string()),
            items: items.clone(),
        })
    }

    pub fn mark_saved(&mut self, meal_id: i64) {
        *self = Self::Saved { meal_id };
    }
}
