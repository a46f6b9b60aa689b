//! Application-level configuration constants.

// Time budget scale
pub const TIME_SCALE_BASE: f64 = 1.8;
pub const MIN_TIME_LEVEL: f64 = 0.0;
pub const MAX_TIME_LEVEL: f64 = 30.0;
pub const TIME_LEVEL_STEP: f64 = 0.01;

// Amount slider
pub const MIN_AMOUNT: f64 = 0.0;
pub const MAX_AMOUNT: f64 = 100.0;
pub const AMOUNT_STEP: f64 = 1.0;

// Sync behaviour
pub const DEBOUNCE_MS: u32 = 250;
pub const RECONNECT_TIMEOUT_MS: u32 = 5_000;
pub const RECONNECT_DELAY_MS: u32 = 5_000;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

// Routing
pub const RECIPE_PATH_PREFIX: &str = "/recipe/";
pub const SOCKET_PATH_PREFIX: &str = "/ws/";

// Query string keys
pub const AMOUNT_KEY: &str = "amount";
pub const TIME_LIMIT_KEY: &str = "timelimit";
pub const INGREDIENTS_TO_BUILD_KEY: &str = "ingredientsToBuild";

/// Runtime knobs for the sync engine. `Default` mirrors the constants above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last slider edit before a request goes out.
    pub debounce_ms: u32,
    /// How long a single connection attempt may stay pending.
    pub reconnect_timeout_ms: u32,
    /// Pause between a failed/dropped connection and the next attempt.
    pub reconnect_delay_ms: u32,
    /// Attempts allowed before the session gives up for good.
    pub max_reconnect_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            reconnect_timeout_ms: RECONNECT_TIMEOUT_MS,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}
