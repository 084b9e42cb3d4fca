//! Bootstrap error types.

use thiserror::Error;

/// Bootstrap error type.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The identity provider never became reachable.
    #[error("timed out waiting for the identity provider after {attempts} attempts")]
    ReadinessTimeout {
        /// Number of probes that were made.
        attempts: u32,
    },

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// API error.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Resource not found.
    #[error("{resource_type} not found: {id}")]
    NotFound {
        /// Type of resource.
        resource_type: String,
        /// Resource identifier.
        id: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BootstrapError {
    /// Shorthand for a missing resource.
    pub fn not_found(resource_type: &str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.to_string(),
            id: id.into(),
        }
    }
}

/// Bootstrap result type.
pub type BootstrapResult<T> = Result<T, BootstrapError>;
