//! Error types for sudobot operations.
//!
//! Defines error types for the major subsystems:
//! - Remote puzzle-service calls (fetch, submit)
//! - Round execution (fetch/solve failures)
//! - Control-surface operations (start, stop, token, initialize)

use thiserror::Error;

/// Errors that can occur while talking to the remote puzzle service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The HTTP request itself failed (connect error, timeout, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with an unexpected status.
    #[error("Service returned HTTP {status}: {message}")]
    BadStatus { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Errors that abort a single solve round.
///
/// Per-cell submission failures are not round errors; they are counted
/// individually and the round keeps going.
#[derive(Debug, Error)]
pub enum RoundError {
    /// Fetching a new board failed; nothing was submitted this round.
    #[error("Failed to fetch a new board: {0}")]
    Fetch(#[source] RemoteError),

    /// The fetched board admits no valid completion.
    #[error("Fetched board has no valid completion")]
    Unsolvable,
}

/// Errors returned synchronously by control-surface operations.
///
/// These are configuration-level failures surfaced to the caller as
/// HTTP 400; they never abort the process or a running loop.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Bot is already running")]
    AlreadyRunning,

    #[error("Authentication token required")]
    MissingToken,

    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Worker is not initialized; call /initialize first")]
    NotInitialized,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
}
