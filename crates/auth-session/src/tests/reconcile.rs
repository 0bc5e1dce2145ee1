//! Reconciling sessions reported by the identity provider.

use super::harness::{identity, profile_for, session_for, TestHarness};
use crate::AuthPhase;

#[tokio::test(start_paused = true)]
async fn no_session_reconciles_to_signed_out() {
    let harness = TestHarness::new();

    let state = harness
        .runtime
        .reconciler()
        .reconcile_existing_session(None)
        .await
        .unwrap();

    assert!(state.user.is_none());
    assert!(state.session.is_none());
    assert!(!state.is_loading);
    assert_eq!(state.phase, AuthPhase::SignedOut);
    assert_eq!(harness.profiles.select_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn session_with_profile_reconciles_to_signed_in() {
    let harness = TestHarness::new();
    let bob = identity("user-bob", "bob@b.com");
    harness.profiles.put(profile_for(&bob, "bob"));

    let state = harness
        .runtime
        .reconciler()
        .reconcile_existing_session(Some(session_for(&bob)))
        .await
        .unwrap();

    assert_eq!(state.user.unwrap().username, "bob");
    assert_eq!(state.session.unwrap().user.id, "user-bob");
    assert!(!state.is_loading);
    assert_eq!(state.phase, AuthPhase::SignedIn);
}

#[tokio::test(start_paused = true)]
async fn live_session_without_profile_row_is_unauthenticated() {
    let harness = TestHarness::new();
    let ghost = identity("user-ghost", "ghost@b.com");

    let state = harness
        .runtime
        .reconciler()
        .reconcile_existing_session(Some(session_for(&ghost)))
        .await
        .unwrap();

    assert!(state.user.is_none());
    assert!(state.session.is_none());
    assert!(!state.is_loading);
    assert_eq!(harness.profiles.select_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn profile_fetch_error_is_unauthenticated() {
    let harness = TestHarness::new();
    let bob = identity("user-bob", "bob@b.com");
    harness.profiles.put(profile_for(&bob, "bob"));
    harness.profiles.fail_selects(true);

    let state = harness
        .runtime
        .reconciler()
        .reconcile_existing_session(Some(session_for(&bob)))
        .await
        .unwrap();

    assert!(!state.is_authenticated());
    assert!(!state.is_loading);
}

#[tokio::test(start_paused = true)]
async fn initialize_restores_stored_session() {
    let harness = TestHarness::new();
    let bob = identity("user-bob", "bob@b.com");
    harness.profiles.put(profile_for(&bob, "bob"));
    harness.provider.set_current(Some(session_for(&bob)));

    assert!(harness.runtime.state().is_loading);
    let state = harness.runtime.initialize().await;

    assert!(state.is_authenticated());
    assert!(!state.is_loading);
    assert_eq!(harness.runtime.access_token().as_deref(), Some("access-user-bob"));
}

#[tokio::test(start_paused = true)]
async fn initialize_without_session_is_signed_out() {
    let harness = TestHarness::new();

    let state = harness.runtime.initialize().await;

    assert!(!state.is_authenticated());
    assert!(!state.is_loading);
    assert_eq!(state.phase, AuthPhase::SignedOut);
    assert!(harness.runtime.access_token().is_none());
}

#[tokio::test(start_paused = true)]
async fn initialize_normalizes_provider_errors() {
    let harness = TestHarness::new();
    harness.provider.fail_get_session(true);

    let state = harness.runtime.initialize().await;

    assert!(state.user.is_none());
    assert!(state.session.is_none());
    assert!(!state.is_loading);
    assert_eq!(state.phase, AuthPhase::SignedOut);
}
