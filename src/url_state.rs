//! Page URL <-> parameter codec.
//!
//! The recipe identifier lives in the path (`/recipe/chocolate-chip-cookies`)
//! and the tunable parameters in the query string:
//!
//! - `amount`: requested yield, plain number
//! - `timelimit`: time budget in whole minutes
//! - `ingredientsToBuild`: comma-separated ingredient names
//!
//! Every key is optional on the way in and always written on the way out.

use crate::config::{
    AMOUNT_KEY, INGREDIENTS_TO_BUILD_KEY, RECIPE_PATH_PREFIX, SOCKET_PATH_PREFIX, TIME_LIMIT_KEY,
};
use crate::error::{InputError, TransportError};
use crate::overrides::OverrideSet;
use crate::params::{checked_amount, normalize_recipe_id, RecipeParameters};
use crate::scale::{clamp_level, clamp_minutes, level_to_minutes, minutes_to_level};
use log::debug;
use url::{form_urlencoded, Url};

/// Query-string half of the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub amount: f64,
    pub time_level: f64,
    pub overrides: OverrideSet,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            amount: 0.0,
            time_level: 0.0,
            overrides: OverrideSet::new(),
        }
    }
}

/// Pull the recipe identifier out of a page path.
///
/// Everything after the recipe prefix is taken, hyphens and slashes become
/// spaces, and the result is normalized like any other recipe id.
pub fn recipe_id_from_path(path: &str) -> Result<String, InputError> {
    let slug = match path.find(RECIPE_PATH_PREFIX) {
        Some(idx) => &path[idx + RECIPE_PATH_PREFIX.len()..],
        None => path,
    };
    normalize_recipe_id(&slug.replace(['-', '/'], " "))
}

/// Decode a query string (without the leading `?`). Keys are independent:
/// a missing or unparsable one falls back to its default on its own.
pub fn decode_query(query: &str) -> QueryState {
    let mut state = QueryState::default();
    let (mut seen_amount, mut seen_time, mut seen_overrides) = (false, false, false);

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match &*key {
            AMOUNT_KEY if !seen_amount => {
                seen_amount = true;
                state.amount = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|v| checked_amount(v).ok())
                    .unwrap_or(0.0);
            }
            TIME_LIMIT_KEY if !seen_time => {
                seen_time = true;
                state.time_level = match value.trim().parse::<f64>() {
                    Ok(minutes) => clamp_level(minutes_to_level(clamp_minutes(minutes))),
                    Err(_) => 0.0,
                };
            }
            INGREDIENTS_TO_BUILD_KEY if !seen_overrides => {
                seen_overrides = true;
                state.overrides = OverrideSet::parse(&value);
            }
            _ => {}
        }
    }
    state
}

/// Seed the parameters from a full page URL.
pub fn decode(location: &Url) -> Result<RecipeParameters, InputError> {
    let recipe_id = recipe_id_from_path(location.path())?;
    let query = decode_query(location.query().unwrap_or(""));
    debug!("decoded {} from {}", recipe_id, location);

    Ok(RecipeParameters::new(&recipe_id)?
        .with_amount(query.amount)
        .with_time_level(query.time_level)
        .with_overrides(query.overrides))
}

/// Time budget as it appears in the URL: whole minutes.
pub fn encoded_minutes(time_level: f64) -> u64 {
    level_to_minutes(time_level).round() as u64
}

/// Encode the parameters as a query string (without the leading `?`).
///
/// Commas between ingredient names are kept literal so the URL stays readable;
/// the names themselves are form-encoded.
pub fn encode(params: &RecipeParameters) -> String {
    let overrides = params
        .overrides
        .keys()
        .iter()
        .map(|name| form_urlencoded::byte_serialize(name.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "{}={}&{}={}&{}={}",
        AMOUNT_KEY,
        params.amount,
        TIME_LIMIT_KEY,
        encoded_minutes(params.time_level),
        INGREDIENTS_TO_BUILD_KEY,
        overrides
    )
}

/// Path plus freshly encoded query, ready for `history.replaceState`.
pub fn page_url(path: &str, params: &RecipeParameters) -> String {
    format!("{}?{}", path, encode(params))
}

/// Socket endpoint for a page: `http`/`https` become `ws`/`wss` and the
/// recipe prefix in the path is swapped for the socket prefix.
pub fn socket_url(page: &Url) -> Result<Url, TransportError> {
    let scheme = match page.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };

    let mut socket = page.clone();
    socket.set_scheme(scheme).map_err(|_| TransportError::Connect {
        url: page.to_string(),
        reason: format!("cannot switch scheme to {}", scheme),
    })?;
    let path = page.path().replacen(RECIPE_PATH_PREFIX, SOCKET_PATH_PREFIX, 1);
    socket.set_path(&path);
    socket.set_query(None);
    socket.set_fragment(None);
    Ok(socket)
}
