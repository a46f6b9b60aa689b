//! Error types for the sync engine.
//!
//! None of these are fatal to the page. Transport errors degrade into a
//! connection status, protocol errors drop the offending frame, and input
//! errors are clamped away before they reach the controller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open connection to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("failed to send frame: {0}")]
    Send(String),

    #[error("connection attempt {attempt} timed out")]
    Timeout { attempt: u32 },

    #[error("gave up after {attempts} reconnection attempts")]
    Exhausted { attempts: u32 },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed server payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server payload is missing `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("recipe identifier cannot be empty")]
    EmptyRecipe,

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

/// Anything that stops the controller from being built for a page.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("page location is unavailable")]
    NoLocation,

    #[error("invalid page url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
