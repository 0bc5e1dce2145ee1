//! Gateway error types.

use thiserror::Error;

/// Error returned by the identity provider and REST clients.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The backend answered with a non-success status (bad credentials,
    /// duplicate email, row-level security violation, ...).
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },

    /// The backend answered 2xx but the body was not what we expected
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// An authenticated call was made without a session
    #[error("Not signed in")]
    NotSignedIn,

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Session storage error
    #[error("Storage error: {0}")]
    Storage(#[from] session_vault::StorageError),
}

impl GatewayError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors are connection failures, timeouts, and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Rejected { status, .. } => *status >= 500,
            GatewayError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Rejected { status, .. } => Some(*status),
            GatewayError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias using GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;
