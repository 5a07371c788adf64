//! Behavior of `CachingFetcher` against a mocked transport.
//!
//! All tests run on a paused clock, so delays are deterministic.

mod common;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use common::{MockTransport, Reply, create_event_collector, init_tracing, settled, user};
use hookbox::{
    CachingFetcher, FetchState, FetchStatus, FetcherConfig, MemoryCache, ResourceKey,
    ResponseCache,
};
use pretty_assertions::assert_eq;
use tokio::time::sleep;

fn key(key: &str) -> ResourceKey {
    ResourceKey::from(key)
}

#[tokio::test(start_paused = true)]
async fn test_fetches_and_publishes_payload() {
    init_tracing();
    let transport = MockTransport::new().json("/users/1", 20, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    assert_eq!(fetcher.status(), FetchStatus::Idle);

    fetcher.set_key("/users/1");
    assert_eq!(fetcher.status(), FetchStatus::Fetching);

    let state = settled(&mut rx).await;
    assert_eq!(state, FetchState::Fetched(user(1, "Ada")));
    assert_eq!(state.error_message(), None);
    assert_eq!(transport.calls_for("/users/1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_same_key_again_is_served_from_cache() {
    let transport = MockTransport::new()
        .json("/users/1", 20, user(1, "Ada"))
        .json("/users/2", 20, user(2, "Alan"));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    let first = settled(&mut rx).await;

    fetcher.set_key("/users/2");
    settled(&mut rx).await;

    // Cache hits are dispatched before `set_key` returns.
    fetcher.set_key("/users/1");
    assert_eq!(fetcher.state(), first);
    assert_eq!(transport.calls_for("/users/1"), 1);

    for _ in 0..3 {
        fetcher.set_key("/users/2");
        fetcher.set_key("/users/1");
    }
    sleep(Duration::from_millis(100)).await;

    assert_eq!(fetcher.state(), first);
    assert_eq!(transport.calls_for("/users/1"), 1);
    assert_eq!(transport.calls_for("/users/2"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_only_latest_key_reaches_state() {
    init_tracing();
    let transport = MockTransport::new()
        .json("/users/1", 100, user(1, "Ada"))
        .json("/users/2", 10, user(2, "Alan"));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    fetcher.set_key("/users/2");

    sleep(Duration::from_millis(150)).await;

    assert_eq!(fetcher.state(), FetchState::Fetched(user(2, "Alan")));
    assert_eq!(*rx.borrow_and_update(), FetchState::Fetched(user(2, "Alan")));
    // The cancelled request never completed, so nothing was cached for it.
    assert!(!fetcher.cache().contains(&key("/users/1")));
    assert!(fetcher.cache().contains(&key("/users/2")));
}

#[tokio::test(start_paused = true)]
async fn test_late_failure_of_superseded_key_is_discarded() {
    let transport = MockTransport::new()
        .route("/users/1", 100, Reply::Status(500))
        .json("/users/2", 10, user(2, "Alan"));
    let fetcher = CachingFetcher::new(transport.clone());

    fetcher.set_key("/users/1");
    fetcher.set_key("/users/2");
    sleep(Duration::from_millis(200)).await;

    assert_eq!(fetcher.status(), FetchStatus::Fetched);
    assert_eq!(fetcher.state().data(), Some(&user(2, "Alan")));
}

#[tokio::test(start_paused = true)]
async fn test_http_error_sets_message_and_skips_cache() {
    let transport = MockTransport::new().route("/users/999", 10, Reply::Status(404));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/999");
    let state = settled(&mut rx).await;

    assert_eq!(state.status(), FetchStatus::Error);
    assert_eq!(state.error_message(), Some("Failed to fetch data"));
    assert_eq!(state.data(), None);
    assert!(!fetcher.cache().contains(&key("/users/999")));
    assert!(fetcher.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_key_is_requested_again() {
    let transport = MockTransport::new()
        .route("/users/999", 10, Reply::Status(404))
        .json("/users/1", 10, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/999");
    settled(&mut rx).await;
    fetcher.set_key("/users/1");
    settled(&mut rx).await;
    fetcher.set_key("/users/999");
    assert_eq!(fetcher.status(), FetchStatus::Fetching);
    settled(&mut rx).await;

    assert_eq!(transport.calls_for("/users/999"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_network_error_message_is_surfaced() {
    let transport =
        MockTransport::new().route("/users/1", 10, Reply::Network("connection refused"));
    let fetcher = CachingFetcher::new(transport);
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    let state = settled(&mut rx).await;

    assert_eq!(state, FetchState::Error("connection refused".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_blank_key_never_fetches() {
    let transport = MockTransport::new().json("/users/1", 10, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());

    fetcher.set_key("");
    fetcher.set_key("   ");
    sleep(Duration::from_millis(50)).await;
    assert_eq!(fetcher.status(), FetchStatus::Idle);
    assert_eq!(transport.calls(), 0);

    let mut rx = fetcher.subscribe();
    fetcher.set_key("/users/1");
    settled(&mut rx).await;

    fetcher.set_key("");
    sleep(Duration::from_millis(50)).await;
    assert_eq!(fetcher.state(), FetchState::Fetched(user(1, "Ada")));
    assert_eq!(transport.calls(), 1);
    assert_eq!(fetcher.key(), Some(key("")));
}

#[tokio::test(start_paused = true)]
async fn test_blank_key_cancels_in_flight_request() {
    let transport = MockTransport::new().json("/users/1", 100, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());

    fetcher.set_key("/users/1");
    fetcher.set_key("");
    sleep(Duration::from_millis(200)).await;

    // Nothing settles the state after a cancelled request.
    assert_eq!(fetcher.status(), FetchStatus::Fetching);
    assert!(fetcher.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_key_is_a_no_op() {
    let transport = MockTransport::new().json("/users/1", 50, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    sleep(Duration::from_millis(10)).await;
    fetcher.set_key("/users/1");
    fetcher.set_key(String::from("/users/1"));

    settled(&mut rx).await;
    assert_eq!(transport.calls_for("/users/1"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_cancelled_key_requests_it_again() {
    let transport = MockTransport::new()
        .json("/users/1", 50, user(1, "Ada"))
        .json("/users/2", 10, user(2, "Alan"));
    let fetcher = CachingFetcher::new(transport.clone());

    fetcher.set_key("/users/1");
    fetcher.set_key("/users/2");
    fetcher.set_key("/users/1");
    sleep(Duration::from_millis(100)).await;

    assert_eq!(fetcher.state(), FetchState::Fetched(user(1, "Ada")));
    assert_eq!(transport.calls_for("/users/1"), 2);
    assert_eq!(transport.calls_for("/users/2"), 1);
    assert!(!fetcher.cache().contains(&key("/users/2")));
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_while_other_key_in_flight() {
    let transport = MockTransport::new()
        .json("/users/1", 10, user(1, "Ada"))
        .json("/users/2", 100, user(2, "Alan"));
    let fetcher = CachingFetcher::new(transport.clone());
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    settled(&mut rx).await;

    fetcher.set_key("/users/2");
    assert_eq!(fetcher.status(), FetchStatus::Fetching);
    sleep(Duration::from_millis(20)).await;

    // The hit bypasses the request machinery but still cancels /users/2.
    fetcher.set_key("/users/1");
    assert_eq!(fetcher.state(), FetchState::Fetched(user(1, "Ada")));

    sleep(Duration::from_millis(200)).await;
    assert_eq!(fetcher.state(), FetchState::Fetched(user(1, "Ada")));
    assert_eq!(transport.calls_for("/users/2"), 1);
    assert!(!fetcher.cache().contains(&key("/users/2")));
}

#[tokio::test(start_paused = true)]
async fn test_detach_suppresses_in_flight_result() {
    let transport = MockTransport::new().json("/users/1", 50, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());

    fetcher.set_key("/users/1");
    fetcher.detach();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(fetcher.status(), FetchStatus::Fetching);
    assert_eq!(fetcher.key(), None);

    // Detaching forgets the key, so the same key starts over.
    let mut rx = fetcher.subscribe();
    fetcher.set_key("/users/1");
    assert_eq!(settled(&mut rx).await, FetchState::Fetched(user(1, "Ada")));
    assert_eq!(transport.calls_for("/users/1"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_drop_cancels_in_flight_request() {
    let transport = MockTransport::new().json("/users/1", 50, user(1, "Ada"));
    let cache = MemoryCache::new();
    let fetcher = CachingFetcher::builder(transport.clone())
        .cache(cache.clone())
        .build();
    let rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    drop(fetcher);
    sleep(Duration::from_millis(100)).await;

    assert_eq!(rx.borrow().status(), FetchStatus::Fetching);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_disabled_cache_always_requests() {
    let transport = MockTransport::new()
        .json("/users/1", 10, user(1, "Ada"))
        .json("/users/2", 10, user(2, "Alan"));
    let fetcher = CachingFetcher::with_config(
        transport.clone(),
        FetcherConfig::builder().disable_cache().build(),
    );
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/1");
    settled(&mut rx).await;
    fetcher.set_key("/users/2");
    settled(&mut rx).await;
    fetcher.set_key("/users/1");
    assert_eq!(fetcher.status(), FetchStatus::Fetching);
    assert_eq!(settled(&mut rx).await, FetchState::Fetched(user(1, "Ada")));

    assert_eq!(transport.calls_for("/users/1"), 2);
    assert!(fetcher.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fetchers_sharing_a_cache() {
    let transport = MockTransport::new().json("/users/1", 10, user(1, "Ada"));
    let cache = MemoryCache::new();
    let first = CachingFetcher::with_cache(transport.clone(), cache.clone());
    let second = CachingFetcher::with_cache(transport.clone(), cache.clone());

    let mut rx = first.subscribe();
    first.set_key("/users/1");
    settled(&mut rx).await;

    second.set_key("/users/1");
    assert_eq!(second.state(), FetchState::Fetched(user(1, "Ada")));
    assert_eq!(transport.calls(), 1);
    assert_eq!(cache.keys(), vec![key("/users/1")]);
}

#[tokio::test(start_paused = true)]
async fn test_builder_applies_initial_key() {
    let transport = MockTransport::new().json("/users/1", 10, user(1, "Ada"));
    let fetcher = CachingFetcher::builder(transport).key("/users/1").build();

    assert_eq!(fetcher.key(), Some(key("/users/1")));
    assert_eq!(fetcher.status(), FetchStatus::Fetching);

    let mut rx = fetcher.subscribe();
    assert_eq!(settled(&mut rx).await, FetchState::Fetched(user(1, "Ada")));
}

#[tokio::test(start_paused = true)]
async fn test_slow_request_logs_warning() {
    let collector = create_event_collector();
    let _guard = tracing::dispatcher::set_default(collector.dispatch());

    let transport = MockTransport::new()
        .json("/users/1", 10, user(1, "Ada"))
        .json("/users/2", 2, user(2, "Alan"));
    let fetcher = CachingFetcher::with_config(
        transport,
        FetcherConfig::builder()
            .slow_request(Duration::from_millis(5))
            .build(),
    );
    let mut rx = fetcher.subscribe();

    fetcher.set_key("/users/2");
    settled(&mut rx).await;
    assert!(collector.warnings().is_empty());

    fetcher.set_key("/users/1");
    assert_eq!(settled(&mut rx).await, FetchState::Fetched(user(1, "Ada")));

    let warnings = collector.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "Request exceeded slow request threshold");
    assert_eq!(warnings[0].field("threshold_ms"), Some("5"));
}

#[test]
fn test_set_key_outside_runtime_leaves_fetcher_untouched() {
    let transport = MockTransport::new().json("/users/1", 10, user(1, "Ada"));
    let fetcher = CachingFetcher::new(transport.clone());

    let result = catch_unwind(AssertUnwindSafe(|| fetcher.set_key("/users/1")));
    assert!(result.is_err());
    assert_eq!(fetcher.key(), None);
    assert_eq!(fetcher.state(), FetchState::Idle);
    assert_eq!(transport.calls(), 0);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        let mut rx = fetcher.subscribe();
        fetcher.set_key("/users/1");
        assert_eq!(settled(&mut rx).await, FetchState::Fetched(user(1, "Ada")));
    });

    // Cached keys need no runtime.
    fetcher.set_key("");
    fetcher.set_key("/users/1");
    assert_eq!(fetcher.state(), FetchState::Fetched(user(1, "Ada")));
    assert_eq!(transport.calls(), 1);
}
