//! Supabase clients for the community feed.
//!
//! - [`GoTrueClient`] implements [`IdentityProvider`] (password auth, session
//!   persistence and refresh, change notifications)
//! - [`SupabaseRestClient`] implements [`ProfileStore`] and [`FeedBackend`]
//!   over PostgREST
//!
//! The traits are the seams the auth and feed layers are written against, so
//! tests can swap in in-memory fakes.

mod error;
mod feed;
mod identity;
mod profiles;
mod response;
mod rest;
mod types;

pub use error::{GatewayError, GatewayResult};
pub use feed::FeedBackend;
pub use identity::{GoTrueClient, IdentityProvider, RefreshConfig};
pub use profiles::ProfileStore;
pub use rest::SupabaseRestClient;
pub use types::{
    AuthChange, AuthChangeEvent, AuthResponse, Comment, Identity, NewComment, NewPost,
    NewProfile, Post, PostUpdate, Profile, Session,
};
