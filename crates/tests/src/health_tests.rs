//! Health monitor reinstating nodes over HTTP.

use crate::mock_infrastructure::{create_multi_client, BeaconMockBuilder};
use multibeacon_core::upstream::UpstreamError;
use std::time::Duration;
use tokio::sync::broadcast;

#[tokio::test]
async fn test_only_ready_nodes_are_reinstated() {
    let mut ready = BeaconMockBuilder::new().await;
    ready.mock_health(200);
    let mut syncing = BeaconMockBuilder::new().await;
    syncing.mock_health(206);

    let client = create_multi_client(&[("ready", &ready.url()), ("syncing", &syncing.url())]);
    let pool = client.pool();
    for name in ["ready", "syncing"] {
        pool.deactivate(&pool.get(name).unwrap(), &UpstreamError::Timeout);
    }

    let monitor = client.health_monitor(Duration::from_secs(60), Duration::from_secs(1));
    assert_eq!(monitor.check_inactive().await, 1);

    assert!(pool.get("ready").unwrap().is_active());
    assert!(!pool.get("syncing").unwrap().is_active());
}

#[tokio::test]
async fn test_active_nodes_are_not_probed() {
    let node = BeaconMockBuilder::new().await;
    let client = create_multi_client(&[("node", &node.url())]);

    let monitor = client.health_monitor(Duration::from_secs(60), Duration::from_secs(1));
    assert_eq!(monitor.check_inactive().await, 0);
    assert!(client.pool().get("node").unwrap().is_active());
}

#[tokio::test]
async fn test_background_monitor_reinstates_node() {
    let mut node = BeaconMockBuilder::new().await;
    node.mock_health(200);

    let client = create_multi_client(&[("node", &node.url())]);
    let pool = client.pool();
    pool.deactivate(&pool.get("node").unwrap(), &UpstreamError::Timeout);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = client
        .health_monitor(Duration::from_millis(50), Duration::from_secs(1))
        .start_with_shutdown(shutdown_rx);

    let mut reinstated = false;
    for _ in 0..40 {
        if pool.active_count() == 1 {
            reinstated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
    assert!(reinstated);
}
