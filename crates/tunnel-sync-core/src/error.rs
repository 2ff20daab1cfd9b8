//! Error types for the tunnel sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the tunnel sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Desired-state source or settings are invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading actual state from the remote system failed
    #[error("Remote fetch failed ({backend}): {message}")]
    RemoteFetch {
        /// Backend name
        backend: String,
        /// Error detail
        message: String,
    },

    /// A mutating call was rejected by the remote system
    #[error("Remote apply failed ({backend}): {message}")]
    RemoteApply {
        /// Backend name
        backend: String,
        /// Error detail, including the remote response body when available
        message: String,
    },

    /// The remote system has no prior state for the requested object
    ///
    /// For the route fetch this is a signal rather than a failure: the
    /// engine consumes it as an empty actual state.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a remote fetch error
    pub fn remote_fetch(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFetch {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a remote apply error
    pub fn remote_apply(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApply {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error means "no prior state exists"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error came from the desired-state side
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Short detail string suitable for reports
    ///
    /// Strips the variant prefix for remote errors so reports show the
    /// remote system's own message.
    pub fn detail(&self) -> String {
        match self {
            Self::RemoteFetch { message, .. } | Self::RemoteApply { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}
