//! The user-chosen request parameters.

use crate::config::MIN_AMOUNT;
use crate::error::InputError;
use crate::overrides::OverrideSet;
use crate::scale::{clamp_level, level_to_minutes};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lower-case a recipe identifier and collapse runs of whitespace.
pub fn normalize_recipe_id(raw: &str) -> Result<String, InputError> {
    let id = WHITESPACE_RUN.replace_all(raw.trim(), " ").to_lowercase();
    if id.is_empty() {
        return Err(InputError::EmptyRecipe);
    }
    Ok(id)
}

/// Reject NaN and infinities and floor the amount at zero.
///
/// The upper bound is left to the slider widget; the server may resolve
/// amounts above it and those must survive a round trip.
pub fn checked_amount(value: f64) -> Result<f64, InputError> {
    if !value.is_finite() {
        return Err(InputError::NonFinite("amount"));
    }
    Ok(value.max(MIN_AMOUNT))
}

/// Reject NaN and infinities, then pull the level into the slider range.
pub fn checked_level(value: f64) -> Result<f64, InputError> {
    if !value.is_finite() {
        return Err(InputError::NonFinite("time level"));
    }
    Ok(clamp_level(value))
}

/// Everything a request to the recipe server is built from.
///
/// The time budget is stored as the slider level; minutes are always derived.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeParameters {
    pub recipe_id: String,
    pub amount: f64,
    pub time_level: f64,
    pub overrides: OverrideSet,
}

impl RecipeParameters {
    pub fn new(recipe_id: &str) -> Result<Self, InputError> {
        Ok(Self {
            recipe_id: normalize_recipe_id(recipe_id)?,
            amount: 0.0,
            time_level: 0.0,
            overrides: OverrideSet::new(),
        })
    }

    pub fn minutes(&self) -> f64 {
        level_to_minutes(self.time_level)
    }

    pub fn with_amount(self, amount: f64) -> Self {
        Self { amount, ..self }
    }

    pub fn with_time_level(self, time_level: f64) -> Self {
        Self { time_level, ..self }
    }

    pub fn with_overrides(self, overrides: OverrideSet) -> Self {
        Self { overrides, ..self }
    }
}
