//! Feed queries and mutations for the community feed.
//!
//! [`FeedService`] reads posts and comments through a TTL [`QueryCache`] and
//! invalidates the affected queries after every successful mutation. Mutations
//! are attributed to the user signed in on the shared `AuthRuntime`.

mod cache;
mod error;
mod service;

#[cfg(test)]
mod tests;

pub use cache::{CachedQuery, QueryCache, QueryKey};
pub use error::{FeedError, FeedResult};
pub use service::FeedService;
