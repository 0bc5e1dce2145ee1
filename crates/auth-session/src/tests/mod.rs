//! Behavioural tests for the auth session lifecycle.
//!
//! - `harness.rs`      - Fake identity provider, fake profile store, runtime wiring
//! - `reconcile.rs`    - Reconciling provider sessions and initialization
//! - `sign_in.rs`      - Password sign-in, rejections and loading
//! - `sign_up.rs`      - Sign-up and profile provisioning
//! - `sign_out.rs`     - Sign-out and direct commits
//! - `listener.rs`     - Change listener and subscription teardown
//! - `invariants.rs`   - Pairing and serialization guarantees

mod reconcile;
mod sign_in;
