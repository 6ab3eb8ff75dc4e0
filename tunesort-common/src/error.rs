//! Common error types for TuneSort

use thiserror::Error;

/// Common result type for TuneSort operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared between the server crate and its components
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Expired or invalid external credential; fatal to the request
    #[error("Authentication failure: {0}")]
    Auth(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
