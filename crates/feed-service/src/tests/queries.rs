//! Cached reads.

use super::harness::{Call, RecordingBackend, TestHarness};
use crate::{FeedError, QueryKey};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn repeated_list_within_ttl_hits_backend_once() {
    let harness = TestHarness::new(RecordingBackend::default().with_post("p1"));

    let first = harness.service.list_posts(0).await.unwrap();
    let second = harness.service.list_posts(0).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(
        harness.backend.calls(),
        vec![Call::ListPosts { page: 0, limit: 10 }]
    );
}

#[tokio::test(start_paused = true)]
async fn pages_are_cached_separately() {
    let harness = TestHarness::new(RecordingBackend::default());

    harness.service.list_posts(0).await.unwrap();
    harness.service.list_posts(1).await.unwrap();
    harness.service.list_posts(1).await.unwrap();

    assert_eq!(
        harness.backend.count(|c| matches!(c, Call::ListPosts { .. })),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn expired_entries_are_refetched() {
    let harness = TestHarness::new(RecordingBackend::default().with_post("p1"));

    harness.service.get_post("p1").await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    harness.service.get_post("p1").await.unwrap();

    assert_eq!(harness.backend.count(|c| matches!(c, Call::GetPost(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_post_is_not_found_and_not_cached() {
    let harness = TestHarness::new(RecordingBackend::default());

    let err = harness.service.get_post("nope").await.unwrap_err();

    assert!(matches!(err, FeedError::PostNotFound(id) if id == "nope"));
    assert!(!harness.service.is_cached(&QueryKey::Post("nope".to_string())));
}

#[tokio::test(start_paused = true)]
async fn reads_do_not_require_sign_in() {
    let harness = TestHarness::new(RecordingBackend::default().with_post("p1"));

    assert_eq!(harness.service.list_comments("p1").await.unwrap().len(), 0);
    assert!(harness
        .service
        .is_cached(&QueryKey::Comments("p1".to_string())));
}

#[tokio::test(start_paused = true)]
async fn cache_is_dropped_when_signed_in_user_changes() {
    let harness = TestHarness::new(RecordingBackend::default().with_post("p1"));
    harness.sign_in().await;
    harness.service.list_posts(0).await.unwrap();
    harness.service.get_post("p1").await.unwrap();

    harness.auth.set_auth(None, None).await;
    harness.service.list_posts(0).await.unwrap();

    assert_eq!(
        harness.backend.count(|c| matches!(c, Call::ListPosts { .. })),
        2
    );
    assert!(!harness.service.is_cached(&QueryKey::Post("p1".to_string())));
}
