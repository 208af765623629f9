//! Chain spec requests through `MultiClient` against mocked beacon nodes.

use crate::mock_infrastructure::{
    create_multi_client, create_test_spec, BeaconMockBuilder, DEAD_NODE,
};
use futures::future::join_all;
use multibeacon_core::{
    spec::{CacheState, SpecValue},
    types::{DomainType, SpecOpts, Version},
    upstream::{RequestContext, UpstreamError},
};
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn test_spec_fails_over_from_dead_node() {
    let mut live = BeaconMockBuilder::new().await;
    live.mock_spec(&create_test_spec(), 1);

    let client = create_multi_client(&[("dead", DEAD_NODE), ("live", &live.url())]);
    let ctx = RequestContext::new();

    let spec = client.spec(&ctx, &SpecOpts::default()).await.unwrap();

    assert_eq!(
        spec.data.get("SECONDS_PER_SLOT").and_then(SpecValue::as_duration),
        Some(Duration::from_secs(12))
    );
    assert_eq!(spec.data.get("SLOTS_PER_EPOCH").and_then(SpecValue::as_u64), Some(32));
    assert_eq!(
        spec.data.get("ELECTRA_FORK_VERSION").and_then(SpecValue::as_version),
        Some(Version([0x05, 0, 0, 0]))
    );
    assert_eq!(
        spec.data.get("DOMAIN_DEPOSIT").and_then(SpecValue::as_domain_type),
        Some(DomainType([0x03, 0, 0, 0]))
    );
    assert_eq!(
        spec.data.get("MIN_GENESIS_TIME").and_then(SpecValue::as_time).map(|t| t.timestamp()),
        Some(1_606_824_000)
    );
    assert_eq!(
        spec.data.get("GENESIS_DELAY").and_then(SpecValue::as_duration),
        Some(Duration::from_secs(604_800))
    );
    assert_eq!(spec.data.get("INACTIVITY_SCORE_BIAS"), Some(&SpecValue::Uint(0)));
    assert_eq!(
        spec.data.get("DEPOSIT_CONTRACT_ADDRESS").and_then(SpecValue::as_bytes).map(<[u8]>::len),
        Some(20)
    );
    assert_eq!(
        spec.data.get("TERMINAL_TOTAL_DIFFICULTY").and_then(SpecValue::as_str),
        Some("58750000000000000000000")
    );
    assert_eq!(
        spec.data.get("DOMAIN_BLS_TO_EXECUTION_CHANGE").and_then(SpecValue::as_domain_type),
        Some(DomainType([0x0a, 0, 0, 0]))
    );

    let schedule = spec.data.get("BLOB_SCHEDULE").and_then(SpecValue::as_list).unwrap();
    let entry = schedule[0].as_map().unwrap();
    assert_eq!(entry.get("MAX_BLOBS_PER_BLOCK").and_then(SpecValue::as_u64), Some(9));

    let dead = client.pool().get("dead").unwrap();
    assert!(!dead.is_active());
    assert!(dead.last_error().is_some());
    assert!(client.pool().get("live").unwrap().is_active());

    // Served from the cache; the live node is not asked again.
    let again = client.spec(&ctx, &SpecOpts::default()).await.unwrap();
    assert!(Arc::ptr_eq(&spec.data, &again.data));
    live.assert_all().await;
}

#[tokio::test]
async fn test_concurrent_callers_share_one_fetch() {
    let mut node = BeaconMockBuilder::new().await;
    node.mock_spec(&create_test_spec(), 1);

    let client = Arc::new(create_multi_client(&[("node", &node.url())]));

    let calls = (0..10).map(|_| {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            client.spec(&RequestContext::new(), &SpecOpts::default()).await.map(|r| r.data)
        })
    });

    let results = join_all(calls).await;
    let first = results[0].as_ref().unwrap().as_ref().unwrap();
    for result in &results {
        let spec = result.as_ref().unwrap().as_ref().unwrap();
        assert!(Arc::ptr_eq(first, spec));
    }

    assert_eq!(client.spec_cache().fetch_count(), 1);
    node.assert_all().await;
}

#[tokio::test]
async fn test_server_error_moves_to_next_node() {
    let mut failing = BeaconMockBuilder::new().await;
    failing.mock_error("/eth/v1/config/spec", 503, "node is syncing");
    let mut live = BeaconMockBuilder::new().await;
    live.mock_spec(&create_test_spec(), 1);

    let client = create_multi_client(&[("failing", &failing.url()), ("live", &live.url())]);
    client.spec(&RequestContext::new(), &SpecOpts::default()).await.unwrap();

    let failing_entry = client.pool().get("failing").unwrap();
    assert!(!failing_entry.is_active());
    assert!(failing_entry.last_error().unwrap().contains("503"));
    failing.assert_all().await;
    live.assert_all().await;
}

#[tokio::test]
async fn test_total_failure_lists_every_node_and_caches_nothing() {
    let mut failing = BeaconMockBuilder::new().await;
    failing.mock_error("/eth/v1/config/spec", 500, "internal error");

    let client = create_multi_client(&[("dead", DEAD_NODE), ("failing", &failing.url())]);
    let err = client.spec(&RequestContext::new(), &SpecOpts::default()).await.unwrap_err();

    let failures = err.failures().expect("aggregated failure");
    assert_eq!(failures.clients().collect::<Vec<_>>(), vec!["dead", "failing"]);
    assert!(failures.failures.iter().any(|f| {
        matches!(f.error, UpstreamError::HttpError(500, ref msg) if msg == "internal error")
    }));
    assert!(err.to_string().contains("dead"));

    assert_eq!(client.spec_cache().state(), CacheState::Empty);
    assert_eq!(client.pool().active_count(), 0);
}

#[tokio::test]
async fn test_deadline_cancels_spec_fetch() {
    let client = create_multi_client(&[("dead", DEAD_NODE)]);
    let ctx = RequestContext::with_timeout(Duration::from_millis(1));
    tokio::time::sleep(Duration::from_millis(5)).await;

    let err = client.spec(&ctx, &SpecOpts::default()).await.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(client.spec_cache().state(), CacheState::Empty);
    assert!(client.pool().get("dead").unwrap().is_active());
}
