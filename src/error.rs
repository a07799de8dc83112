//! Error types for the HBase tools

use thiserror::Error;

/// Errors that can occur when talking to the HBase REST gateway
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication failed (missing or wrong credentials)
    #[error("Unauthorized: invalid credentials")]
    Unauthorized,

    /// The gateway refused the operation (e.g. namespace already exists)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Namespace, table, row or scanner was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// `create_table` on a table that is already there
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// The gateway rejected the request as malformed (any other 4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway returned a server-side error
    #[error("Server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error message from the gateway
        message: String,
    },

    /// The gateway could not be reached or the exchange broke off
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(String),

    /// A body did not match the gateway's JSON models
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Request timeout
    #[error("No response from the gateway within {0}ms")]
    Timeout(u64),

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    Tls(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for the "does not exist" family of failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
