//! Unified error handling for tienda-core

use thiserror::Error;

/// Core error type for tienda-core
///
/// Cloneable so a single failed fetch can be handed to every subscriber
/// of the same report query.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Transport failure (connect, timeout, broken body)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the reports backend
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Malformed input rejected before or by the service
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response body could not be decoded or had the wrong shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request feeding a subscriber was dropped before it finished
    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for tienda-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an invalid response error
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Error::InvalidResponse(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Create a server error from a status code and response body
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Error::Server {
            status,
            message: message.into(),
        }
    }

    /// Whether a caller-initiated retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Cancelled(_) => true,
            Error::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network("Request timed out".to_string())
        } else if err.is_connect() {
            Error::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            Error::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Error::server(status.as_u16(), err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

// Convert to String for front-end command returns
impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
