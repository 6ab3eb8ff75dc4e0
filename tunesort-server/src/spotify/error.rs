//! Spotify client errors

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the gateway and the underlying API client
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Expired or invalid credential; fatal to the request
    #[error("Authentication failure: {0}")]
    Auth(String),

    /// Throttled by the service (HTTP 429); retried by the gateway up to
    /// a bounded attempt count before being surfaced
    #[error("Rate limited by Spotify API")]
    Throttled {
        /// Server-requested backoff, when the response carried one
        retry_after: Option<Duration>,
    },

    /// Non-throttle API error
    #[error("Spotify API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Malformed response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,
}

impl SpotifyError {
    pub fn is_throttle(&self) -> bool {
        matches!(self, SpotifyError::Throttled { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, SpotifyError::Auth(_))
    }
}
