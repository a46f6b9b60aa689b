//! Exponential mapping between the time-budget slider and real minutes.
//!
//! The slider moves linearly over `[MIN_TIME_LEVEL, MAX_TIME_LEVEL]` while the
//! budget it stands for grows as `TIME_SCALE_BASE.powf(level)`. Level 0 is one
//! minute and level 30 is a little over 80 years, which is what lets a single
//! control cover "quick snack" through "raise the cow".

use crate::config::{MAX_TIME_LEVEL, MIN_TIME_LEVEL, TIME_SCALE_BASE};

/// Minutes represented by a slider level.
#[inline]
pub fn level_to_minutes(level: f64) -> f64 {
    TIME_SCALE_BASE.powf(level)
}

/// Slider level for a budget in minutes.
///
/// `minutes` must be positive; clamp with [`clamp_minutes`] first when the
/// value comes from outside.
#[inline]
pub fn minutes_to_level(minutes: f64) -> f64 {
    minutes.ln() / TIME_SCALE_BASE.ln()
}

/// Keep a slider level inside the range the UI can show.
pub fn clamp_level(level: f64) -> f64 {
    if level.is_nan() {
        return MIN_TIME_LEVEL;
    }
    level.clamp(MIN_TIME_LEVEL, MAX_TIME_LEVEL)
}

/// Smallest budget that still maps onto the slider (level 0).
pub fn clamp_minutes(minutes: f64) -> f64 {
    if minutes.is_nan() || minutes < 1.0 {
        1.0
    } else {
        minutes.min(level_to_minutes(MAX_TIME_LEVEL))
    }
}

const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;
const MINUTES_PER_WEEK: u64 = 7 * MINUTES_PER_DAY;
const MINUTES_PER_MONTH: u64 = 30 * MINUTES_PER_DAY;
const MINUTES_PER_YEAR: u64 = 365 * MINUTES_PER_DAY;

/// Largest-first calendar units used when spelling out a budget.
const UNITS: [(u64, &str); 6] = [
    (MINUTES_PER_YEAR, "years"),
    (MINUTES_PER_MONTH, "months"),
    (MINUTES_PER_WEEK, "weeks"),
    (MINUTES_PER_DAY, "days"),
    (MINUTES_PER_HOUR, "hrs"),
    (1, "min"),
];

/// Render a budget as e.g. `"1 days, 3 hrs, 2 min"`, dropping zero units.
///
/// # Examples
/// ```
/// use recipe_explorer::scale::format_time_budget;
/// assert_eq!(format_time_budget(62.0), "1 hrs, 2 min");
/// assert_eq!(format_time_budget(0.4), "0 min");
/// ```
pub fn format_time_budget(minutes: f64) -> String {
    if !minutes.is_finite() || minutes < 1.0 {
        return "0 min".to_string();
    }

    let mut remaining = minutes.round() as u64;
    let mut parts = Vec::new();
    for (size, label) in UNITS {
        let count = remaining / size;
        if count > 0 {
            parts.push(format!("{} {}", count, label));
            remaining %= size;
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trips_through_minutes() {
        for level in [0.0, 0.5, 6.0, 12.34, 29.99, 30.0] {
            let back = minutes_to_level(level_to_minutes(level));
            assert!((back - level).abs() < 1e-9, "level {} came back as {}", level, back);
        }
    }

    #[test]
    fn level_six_is_about_thirty_four_minutes() {
        let minutes = level_to_minutes(6.0);
        assert!((minutes - 34.012224).abs() < 1e-3);
        assert!((minutes_to_level(minutes) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_out_of_range_input() {
        assert_eq!(clamp_level(-3.0), MIN_TIME_LEVEL);
        assert_eq!(clamp_level(45.0), MAX_TIME_LEVEL);
        assert_eq!(clamp_level(f64::NAN), MIN_TIME_LEVEL);
        assert_eq!(clamp_minutes(0.0), 1.0);
        assert_eq!(clamp_minutes(-10.0), 1.0);
        assert_eq!(clamp_minutes(60.0), 60.0);
    }

    #[test]
    fn formats_budget_largest_unit_first() {
        assert_eq!(format_time_budget(45.0), "45 min");
        assert_eq!(format_time_budget(60.0), "1 hrs");
        assert_eq!(format_time_budget(1_500.0), "1 days, 1 hrs");
        assert_eq!(
            format_time_budget((MINUTES_PER_YEAR + MINUTES_PER_WEEK + 5) as f64),
            "1 years, 1 weeks, 5 min"
        );
    }
}
