// Session resolution through the read-through cache
use oathkeeper_login::cache::{session_key, CacheStore, MemoryStore};
use oathkeeper_login::models::Session;
use oathkeeper_login::providers::ProviderRequest;
use oathkeeper_login::session::{Resolution, SessionResolver};
use oathkeeper_login::testing::constants::TEST_TTL;
use oathkeeper_login::testing::{ManualClockStore, MockProvider, TestFixtures};
use std::sync::Arc;
use std::time::Duration;

fn ghost() -> MockProvider {
    MockProvider::new("ghost", "ghost-admin-api-session").with_default_return_path("/ghost")
}

#[tokio::test]
async fn test_repeat_resolution_within_ttl_calls_provider_once() {
    let store = Arc::new(ManualClockStore::new());
    let provider = ghost().accepting("abc", TestFixtures::session());
    let resolver = TestFixtures::resolver(store.clone());
    let request = ProviderRequest::new().with_cookie("abc");

    let first = resolver.resolve(&provider, &request).await;
    store.advance(Duration::from_secs(60));
    let second = resolver.resolve(&provider, &request).await;

    assert_eq!(first, Resolution::Authenticated(TestFixtures::session()));
    assert_eq!(second, first);
    assert_eq!(provider.verify_calls(), 1);
}

#[tokio::test]
async fn test_ghost_scenario_cache_expires_after_fifteen_minutes() {
    let store = Arc::new(ManualClockStore::new());
    let provider = ghost().accepting("abc", Session::with_email("42", "a@b.com"));
    let resolver = TestFixtures::resolver(store.clone());
    let request = ProviderRequest::new().with_cookie("abc");

    // t=0 and t=5m: one upstream call, then a cache hit
    let expected = Resolution::Authenticated(Session::with_email("42", "a@b.com"));
    assert_eq!(resolver.resolve(&provider, &request).await, expected);
    assert_eq!(
        store.peek("ghost:abc").as_deref(),
        Some(r#"{"subject":"42","extra":{"email":"a@b.com"}}"#)
    );
    store.advance(Duration::from_secs(5 * 60));
    assert_eq!(resolver.resolve(&provider, &request).await, expected);
    assert_eq!(provider.verify_calls(), 1);

    // t=16m: the entry is gone and Ghost is asked again
    store.advance(Duration::from_secs(11 * 60));
    assert_eq!(resolver.resolve(&provider, &request).await, expected);
    assert_eq!(provider.verify_calls(), 2);
}

#[tokio::test]
async fn test_ttl_boundary() {
    let store = Arc::new(ManualClockStore::new());
    let provider = ghost().accepting("abc", TestFixtures::session());
    let resolver = TestFixtures::resolver(store.clone());
    let request = ProviderRequest::new().with_cookie("abc");

    resolver.resolve(&provider, &request).await;

    store.advance(TEST_TTL - Duration::from_millis(1));
    assert!(store.peek("ghost:abc").is_some());

    store.advance(Duration::from_millis(2));
    assert!(store.peek("ghost:abc").is_none());
}

#[tokio::test]
async fn test_ttl_against_memory_backend() {
    let store = Arc::new(MemoryStore::new(100));
    let provider = ghost().accepting("abc", TestFixtures::session());
    let resolver = SessionResolver::new(store.clone(), Duration::from_millis(300));
    let request = ProviderRequest::new().with_cookie("abc");

    resolver.resolve(&provider, &request).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(store.get("ghost:abc").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(store.get("ghost:abc").await.unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_entry_is_replaced() {
    let store = Arc::new(ManualClockStore::new());
    store.plant("ghost:abc", "not json", TEST_TTL);
    let provider = ghost().accepting("abc", TestFixtures::session());
    let resolver = TestFixtures::resolver(store.clone());

    let resolution = resolver
        .resolve(&provider, &ProviderRequest::new().with_cookie("abc"))
        .await;

    assert_eq!(resolution, Resolution::Authenticated(TestFixtures::session()));
    assert_eq!(store.deletes(), 1);
    assert_eq!(provider.verify_calls(), 1);
    let cached: Session = serde_json::from_str(&store.peek("ghost:abc").unwrap()).unwrap();
    assert_eq!(cached, TestFixtures::session());
}

#[tokio::test]
async fn test_corrupt_entry_with_rejected_cookie() {
    let store = Arc::new(ManualClockStore::new());
    store.plant("ghost:abc", "{", TEST_TTL);
    let provider = ghost();
    let resolver = TestFixtures::resolver(store.clone());

    let resolution = resolver
        .resolve(&provider, &ProviderRequest::new().with_cookie("abc"))
        .await;

    assert_eq!(resolution, Resolution::Unauthenticated);
    assert!(store.peek("ghost:abc").is_none());
    assert_eq!(store.sets(), 0);
}

#[tokio::test]
async fn test_failed_verification_is_never_cached() {
    let store = Arc::new(ManualClockStore::new());
    let provider = ghost();
    let resolver = TestFixtures::resolver(store.clone());
    let request = ProviderRequest::new().with_cookie("revoked");

    for _ in 0..3 {
        assert_eq!(
            resolver.resolve(&provider, &request).await,
            Resolution::Unauthenticated
        );
    }

    assert_eq!(store.sets(), 0);
    assert_eq!(provider.verify_calls(), 3);
}

#[tokio::test]
async fn test_missing_cookie_touches_nothing() {
    let store = Arc::new(ManualClockStore::new());
    let provider = MockProvider::new("argo-cd", "argocd.token");
    let resolver = TestFixtures::resolver(store.clone());

    let resolution = resolver.resolve(&provider, &ProviderRequest::new()).await;

    assert_eq!(resolution, Resolution::Unauthenticated);
    assert_eq!(store.gets(), 0);
    assert_eq!(provider.verify_calls(), 0);
}

#[tokio::test]
async fn test_failed_cache_write_still_authenticates() {
    let store = Arc::new(ManualClockStore::new());
    store.fail_writes(true);
    let provider = ghost().accepting("abc", TestFixtures::session());
    let resolver = TestFixtures::resolver(store.clone());

    let resolution = resolver
        .resolve(&provider, &ProviderRequest::new().with_cookie("abc"))
        .await;

    assert_eq!(resolution, Resolution::Authenticated(TestFixtures::session()));
    assert_eq!(store.sets(), 1);
    assert!(store.peek("ghost:abc").is_none());
}

#[tokio::test]
async fn test_providers_do_not_share_entries() {
    let store = Arc::new(ManualClockStore::new());
    let ghost = ghost().accepting("abc", Session::new("ghost-user"));
    let n8n = MockProvider::new("n8n", "n8n-auth").accepting("abc", Session::new("n8n-user"));
    let resolver = TestFixtures::resolver(store.clone());
    let request = ProviderRequest::new().with_cookie("abc");

    assert_eq!(
        resolver.resolve(&ghost, &request).await,
        Resolution::Authenticated(Session::new("ghost-user"))
    );
    assert_eq!(
        resolver.resolve(&n8n, &request).await,
        Resolution::Authenticated(Session::new("n8n-user"))
    );
    assert!(store.peek(&session_key("ghost", "abc")).is_some());
    assert!(store.peek(&session_key("n8n", "abc")).is_some());
}

#[tokio::test]
async fn test_forwarded_headers_reach_provider() {
    let store = Arc::new(ManualClockStore::new());
    let provider = MockProvider::new("n8n", "n8n-auth")
        .with_forwarded_headers(&["Browser-Id"])
        .accepting("tok", TestFixtures::session());
    let resolver = TestFixtures::resolver(store);
    let request = ProviderRequest::new()
        .with_cookie("tok")
        .with_header("Browser-Id", "b-7");

    resolver.resolve(&provider, &request).await;

    assert_eq!(provider.last_request().unwrap().header("Browser-Id"), "b-7");
}
