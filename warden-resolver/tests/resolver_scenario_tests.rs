//! Scenario, concurrency and deadline tests for the access resolver.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use warden_resolver::{AccessResolver, ResolutionSource};
use warden_test_utils::*;

async fn scenario_resolver() -> (
    AccessResolver<InMemoryCacheStore, FakeAuthority>,
    Arc<FakeAuthority>,
) {
    let store = Arc::new(seeded_store().await.unwrap());
    let authority = Arc::new(scenario_authority());
    (
        AccessResolver::with_defaults(store, Arc::clone(&authority)),
        authority,
    )
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[tokio::test]
async fn scenario_cached_thing_key() {
    let (resolver, authority) = scenario_resolver().await;
    let thing_id = resolver
        .identify(&CallContext::background(), CACHED_CREDENTIAL)
        .await
        .unwrap();

    assert_eq!(thing_id.as_str(), "thing-42");
    assert_eq!(authority.total_calls(), 0);
}

#[tokio::test]
async fn scenario_uncached_thing_key_resolved_remotely() {
    let (resolver, authority) = scenario_resolver().await;
    let thing_id = resolver
        .identify(&CallContext::background(), REMOTE_CREDENTIAL)
        .await
        .unwrap();

    assert_eq!(thing_id.as_str(), "thing-99");
    assert_eq!(authority.identify_calls(), 1);
}

#[tokio::test]
async fn scenario_cached_channel_member() {
    let (resolver, authority) = scenario_resolver().await;
    resolver
        .authorize(&CallContext::background(), CACHED_CHANNEL, CACHED_THING)
        .await
        .unwrap();
    assert_eq!(authority.total_calls(), 0);
}

#[tokio::test]
async fn scenario_outsider_denied_after_remote_check() {
    let (resolver, authority) = scenario_resolver().await;
    let err = resolver
        .authorize(&CallContext::background(), CACHED_CHANNEL, OUTSIDER_THING)
        .await
        .unwrap_err();

    assert!(err.is_denied(), "expected denial, got {:?}", err);
    assert_eq!(authority.check_access_calls(), 1);
    assert!(err.to_string().contains("channel:7"));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_are_independent() {
    let (resolver, authority) = scenario_resolver().await;
    let ctx = CallContext::background();

    let identifies = (0..32).map(|i| {
        let resolver = resolver.clone();
        let ctx = ctx.clone();
        async move {
            let key = match i % 3 {
                0 => CACHED_CREDENTIAL,
                1 => REMOTE_CREDENTIAL,
                _ => "unknown-key",
            };
            (i, resolver.identify(&ctx, key).await)
        }
    });

    for (i, result) in join_all(identifies).await {
        match i % 3 {
            0 => assert_eq!(result.unwrap(), thing(CACHED_THING)),
            1 => assert_eq!(result.unwrap(), thing(REMOTE_THING)),
            _ => assert!(result.is_err()),
        }
    }

    // Only the two uncached shapes reach the authority.
    let remote_calls = (0..32).filter(|i| i % 3 != 0).count();
    assert_eq!(authority.identify_calls(), remote_calls);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_authorizations_spawned_on_runtime() {
    let store = Arc::new(seeded_store().await.unwrap());
    let authority = Arc::new(FakeAuthority::new().with_grant(CACHED_CHANNEL, "thing-granted"));
    let resolver = AccessResolver::with_defaults(store, Arc::clone(&authority));

    let handles: Vec<_> = ["thing-42", "thing-granted", "thing-1"]
        .into_iter()
        .cycle()
        .take(30)
        .map(|thing_id| {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let outcome = resolver
                    .authorize(&CallContext::background(), CACHED_CHANNEL, thing_id)
                    .await;
                (thing_id, outcome)
            })
        })
        .collect();

    for handle in handles {
        let (thing_id, outcome) = handle.await.unwrap();
        match thing_id {
            "thing-1" => assert!(outcome.unwrap_err().is_denied()),
            _ => assert!(outcome.is_ok()),
        }
    }
    assert_eq!(authority.check_access_calls(), 20);
}

// ============================================================================
// DEADLINES AND CANCELLATION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn slow_cache_counts_as_miss() {
    let store = Arc::new(SlowCacheStore::new(
        seeded_store().await.unwrap(),
        Duration::from_secs(5),
    ));
    let authority = Arc::new(scenario_authority().with_identity(CACHED_CREDENTIAL, "thing-from-authority"));
    let resolver = AccessResolver::new(
        store,
        Arc::clone(&authority),
        ResolverConfig::default().with_cache_timeout(Duration::from_millis(20)),
    );

    let resolution = resolver
        .resolve_identity(&CallContext::background(), &credential(CACHED_CREDENTIAL))
        .await
        .unwrap();

    assert_eq!(resolution.source(), ResolutionSource::Authority);
    assert!(matches!(
        resolution.cache_fault(),
        Some(CacheError::Timeout { .. })
    ));
    assert_eq!(resolution.into_value(), thing("thing-from-authority"));
}

#[tokio::test(start_paused = true)]
async fn slow_authority_surfaces_deadline_exceeded() {
    let store = Arc::new(InMemoryCacheStore::new());
    let authority = Arc::new(scenario_authority().with_delay(Duration::from_secs(30)));
    let resolver = AccessResolver::with_defaults(store, authority);

    let err = resolver
        .identify(
            &CallContext::with_timeout(Duration::from_millis(100)),
            REMOTE_CREDENTIAL,
        )
        .await
        .unwrap_err();
    assert_eq!(err.authority_error(), Some(&AuthorityError::DeadlineExceeded));

    let err = resolver
        .authorize(&CallContext::background(), CACHED_CHANNEL, CACHED_THING)
        .await
        .unwrap_err();
    assert!(!err.is_denied());
    assert_eq!(err.authority_error(), Some(&AuthorityError::DeadlineExceeded));
}

#[tokio::test]
async fn cancelled_context_stops_before_any_answer() {
    let (resolver, authority) = scenario_resolver().await;
    let token = CancellationToken::new();
    token.cancel();
    let ctx = CallContext::background().with_cancellation(token);

    let err = resolver.identify(&ctx, CACHED_CREDENTIAL).await.unwrap_err();
    assert_eq!(err, AccessError::Cancelled { operation: "identify" });

    let err = resolver
        .authorize(&ctx, CACHED_CHANNEL, CACHED_THING)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(authority.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_remote_call() {
    let store = Arc::new(InMemoryCacheStore::new());
    let authority = Arc::new(scenario_authority().with_delay(Duration::from_millis(500)));
    let resolver = AccessResolver::with_defaults(store, Arc::clone(&authority));
    let token = CancellationToken::new();
    let ctx = CallContext::background().with_cancellation(token.clone());

    let (result, ()) = tokio::join!(resolver.identify(&ctx, REMOTE_CREDENTIAL), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    assert_eq!(result, Err(AccessError::Cancelled { operation: "identify" }));
    assert_eq!(authority.identify_calls(), 1);
}
