//! Feed service tests.
//!
//! - `harness.rs`      - Recording feed backend and a signed-in auth runtime
//! - `queries.rs`      - Cached reads
//! - `mutations.rs`    - Authentication checks and cache invalidation

pub(crate) mod harness;
mod queries;
