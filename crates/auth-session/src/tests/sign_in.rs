//! Password sign-in.

use super::harness::{settle, TestHarness, ALICE_EMAIL, ALICE_PASSWORD};
use crate::{AuthError, AuthPhase};
use std::time::Duration;
use supabase_gateway::GatewayError;

#[tokio::test(start_paused = true)]
async fn sign_in_commits_profile_and_session() {
    let harness = TestHarness::new();
    harness.seed_user(ALICE_EMAIL, ALICE_PASSWORD, "alice");

    let state = harness
        .runtime
        .sign_in(ALICE_EMAIL, ALICE_PASSWORD)
        .await
        .unwrap();

    assert_eq!(state.user.as_ref().unwrap().username, "alice");
    assert!(state.session.is_some());
    assert!(!state.is_loading);
    assert_eq!(state.phase, AuthPhase::SignedIn);
    assert_eq!(harness.runtime.state(), state);
}

#[tokio::test(start_paused = true)]
async fn wrong_password_surfaces_provider_error() {
    let harness = TestHarness::new();
    harness.seed_user(ALICE_EMAIL, ALICE_PASSWORD, "alice");
    harness.runtime.initialize().await;

    let err = harness
        .runtime
        .sign_in(ALICE_EMAIL, "wrong-password")
        .await
        .unwrap_err();

    match err {
        AuthError::Provider(GatewayError::Rejected { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let state = harness.runtime.state();
    assert!(!state.is_loading);
    assert!(!state.is_authenticated());
    assert_eq!(state.phase, AuthPhase::SignedOut);
}

#[tokio::test(start_paused = true)]
async fn failed_sign_in_keeps_prior_user() {
    let harness = TestHarness::new();
    harness.signed_in_alice().await;
    let before = harness.runtime.state();

    assert!(harness
        .runtime
        .sign_in("nobody@b.com", "whatever")
        .await
        .is_err());

    let after = harness.runtime.state();
    assert_eq!(after.user, before.user);
    assert_eq!(after.session, before.session);
    assert!(!after.is_loading);
    assert_eq!(after.phase, AuthPhase::SignedIn);
}

#[tokio::test(start_paused = true)]
async fn sign_in_without_profile_is_unauthenticated_not_error() {
    let harness = TestHarness::new();
    harness.provider.add_account(ALICE_EMAIL, ALICE_PASSWORD);

    let state = harness
        .runtime
        .sign_in(ALICE_EMAIL, ALICE_PASSWORD)
        .await
        .unwrap();

    assert!(state.user.is_none());
    assert!(state.session.is_none());
    assert!(!state.is_loading);
    assert_eq!(harness.profiles.insert_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn loading_is_set_while_sign_in_is_in_flight() {
    let harness = TestHarness::new();
    harness.seed_user(ALICE_EMAIL, ALICE_PASSWORD, "alice");
    harness.runtime.initialize().await;
    harness
        .provider
        .set_sign_in_delay(Duration::from_millis(200));

    let runtime = harness.runtime.clone();
    let task = tokio::spawn(async move { runtime.sign_in(ALICE_EMAIL, ALICE_PASSWORD).await });
    settle().await;

    let during = harness.runtime.state();
    assert!(during.is_loading);
    assert_eq!(during.phase, AuthPhase::SigningIn);

    let state = task.await.unwrap().unwrap();
    assert!(!state.is_loading);
    assert!(state.is_authenticated());
}
