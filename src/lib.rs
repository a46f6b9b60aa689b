//! Client-side sync engine for the recipe explorer.
//!
//! The page shows one recipe. The user scales the amount, sets a time budget
//! and picks ingredients to build from scratch; the server answers each change
//! with a fresh plan over a websocket. This crate keeps those parameters, the
//! page URL and the connection in step, and hands the latest plan to the UI.

pub mod browser;
pub mod config;
pub mod controller;
pub mod error;
pub mod overrides;
pub mod params;
pub mod protocol;
pub mod scale;
pub mod snapshot;
pub mod timer;
pub mod transport;
pub mod url_state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{HistorySink, SyncController, SyncPhase, ViewListener, ViewState};
pub use error::{InputError, ProtocolError, StartupError, TransportError};
pub use overrides::OverrideSet;
pub use params::RecipeParameters;
pub use scale::{format_time_budget, level_to_minutes, minutes_to_level};
pub use snapshot::{DirectionView, IngredientView, RecipeSnapshot};
pub use transport::{ConnectionState, TransportSession};
