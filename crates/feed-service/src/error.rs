//! Feed service error types.

use supabase_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    /// A mutation was attempted without an authenticated state
    #[error("Not signed in")]
    NotSignedIn,

    #[error("Post not found: {0}")]
    PostNotFound(String),

    /// An update that would change nothing
    #[error("Nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    Backend(#[from] GatewayError),
}

/// Result type alias using FeedError.
pub type FeedResult<T> = Result<T, FeedError>;
