//! Auth session error types.

use supabase_gateway::GatewayError;
use thiserror::Error;

/// Error returned by the reconciler and the runtime facade.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity provider rejected or failed the call
    #[error(transparent)]
    Provider(#[from] GatewayError),

    /// Invalid state transition in the phase machine
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Provider(e) => e.is_transient(),
            AuthError::InvalidStateTransition(_) => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
