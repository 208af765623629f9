//! State endpoint requests: decoding, metadata and failure classification over HTTP.

use crate::mock_infrastructure::{
    create_multi_client, create_test_consolidation, create_test_withdrawal, BeaconMockBuilder,
    DEAD_NODE,
};
use multibeacon_core::{
    types::{
        PendingConsolidation, PendingConsolidationsOpts, PendingPartialWithdrawal,
        PendingPartialWithdrawalsOpts,
    },
    upstream::{DispatchConfig, DispatchError, DispatchMode, RequestContext, VERSION_METADATA_KEY},
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_pending_partial_withdrawals_decoded_with_metadata() {
    let mut node = BeaconMockBuilder::new().await;
    node.mock_pending_partial_withdrawals(
        "head",
        &[create_test_withdrawal(7), create_test_withdrawal(8)],
        "electra",
    );

    let client = create_multi_client(&[("node", &node.url())]);
    let response = client
        .pending_partial_withdrawals(
            &RequestContext::new(),
            &PendingPartialWithdrawalsOpts::for_state("head"),
        )
        .await
        .unwrap();

    assert_eq!(
        response.data,
        vec![
            PendingPartialWithdrawal {
                validator_index: 7,
                amount: 1_000_000_000,
                withdrawable_epoch: 364_100
            },
            PendingPartialWithdrawal {
                validator_index: 8,
                amount: 1_000_000_000,
                withdrawable_epoch: 364_100
            },
        ]
    );
    assert_eq!(response.metadata.get(VERSION_METADATA_KEY), Some(&json!("electra")));
    assert_eq!(response.metadata.get("execution_optimistic"), Some(&json!(false)));
    assert_eq!(response.metadata.get("finalized"), Some(&json!(true)));
    node.assert_all().await;
}

#[tokio::test]
async fn test_not_found_fails_over_without_deactivating() {
    let mut missing = BeaconMockBuilder::new().await;
    missing.mock_error(
        "/eth/v1/beacon/states/finalized/pending_consolidations",
        404,
        "State not found",
    );
    let mut live = BeaconMockBuilder::new().await;
    live.mock_pending_consolidations("finalized", &[create_test_consolidation(1, 2)], "electra");

    let client = create_multi_client(&[("missing", &missing.url()), ("live", &live.url())]);
    let response = client
        .pending_consolidations(
            &RequestContext::new(),
            &PendingConsolidationsOpts::for_state("finalized"),
        )
        .await
        .unwrap();

    assert_eq!(response.data, vec![PendingConsolidation { source_index: 1, target_index: 2 }]);
    assert!(client.pool().get("missing").unwrap().is_active());
    missing.assert_all().await;
}

#[tokio::test]
async fn test_client_errors_reported_per_node() {
    let mut a = BeaconMockBuilder::new().await;
    a.mock_error("/eth/v1/beacon/states/0xbad/pending_consolidations", 400, "Invalid state ID");
    let mut b = BeaconMockBuilder::new().await;
    b.mock_error("/eth/v1/beacon/states/0xbad/pending_consolidations", 400, "Invalid state ID");

    let client = create_multi_client(&[("a", &a.url()), ("b", &b.url())]);
    let err = client
        .pending_consolidations(
            &RequestContext::new(),
            &PendingConsolidationsOpts::for_state("0xbad"),
        )
        .await
        .unwrap_err();

    let DispatchError::Aggregated(failures) = &err else {
        panic!("expected aggregated failure, got {err}");
    };
    assert_eq!(failures.len(), 2);
    assert!(err.to_string().contains("Invalid state ID"));
    assert_eq!(client.pool().active_count(), 2);
}

#[tokio::test]
async fn test_empty_state_never_reaches_nodes() {
    let node = BeaconMockBuilder::new().await;
    let client = create_multi_client(&[("node", &node.url())]);

    let err = client
        .pending_partial_withdrawals(
            &RequestContext::new(),
            &PendingPartialWithdrawalsOpts::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::InvalidOptions(_)));
    assert_eq!(client.pool().get("node").unwrap().failure_count(), 0);
}

#[tokio::test]
async fn test_parallel_mode_skips_dead_node() {
    let mut live = BeaconMockBuilder::new().await;
    live.mock_pending_consolidations("head", &[create_test_consolidation(3, 4)], "electra");

    let client = create_multi_client(&[("dead", DEAD_NODE), ("live", &live.url())]);
    client
        .dispatcher()
        .update_config(DispatchConfig { mode: DispatchMode::Parallel, max_parallel: 2 });

    let response = client
        .pending_consolidations(
            &RequestContext::new(),
            &PendingConsolidationsOpts::for_state("head"),
        )
        .await
        .unwrap();

    assert_eq!(response.data, vec![PendingConsolidation { source_index: 3, target_index: 4 }]);
}

#[tokio::test]
async fn test_no_active_nodes() {
    let client = create_multi_client(&[("dead", DEAD_NODE)]);
    let ctx = RequestContext::new();
    let opts = PendingConsolidationsOpts::for_state("head");

    assert!(client.pending_consolidations(&ctx, &opts).await.is_err());
    assert_eq!(client.pool().active_count(), 0);

    let err = client.pending_consolidations(&ctx, &opts).await.unwrap_err();
    assert!(err.failures().is_some_and(|f| f.is_empty()));
    assert_eq!(err.to_string(), "no active upstream clients");
}

/// Accepts connections and never answers them.
async fn hung_node() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_hung_node_past_caller_deadline_stays_active() {
    let url = hung_node().await;
    let client = create_multi_client(&[("hung", &url)]);

    for _ in 0..10 {
        let ctx = RequestContext::with_timeout(Duration::from_millis(100));
        let err = client
            .pending_partial_withdrawals(&ctx, &PendingPartialWithdrawalsOpts::for_state("head"))
            .await
            .unwrap_err();

        assert!(err.is_cancelled(), "expected cancellation, got {err}");
        assert_eq!(client.pool().active_count(), 1);
    }

    assert_eq!(client.pool().get("hung").unwrap().failure_count(), 0);
}
