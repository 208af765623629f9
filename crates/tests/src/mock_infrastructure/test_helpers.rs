//! Test Helper Functions and Utilities
//!
//! Common helpers for creating beacon fixtures and clients.

use multibeacon_core::{
    upstream::{BeaconHttpClient, ConsensusClient, HttpClient, HttpClientConfig},
    MultiClient,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};

/// Address nothing listens on; connections are refused immediately.
pub const DEAD_NODE: &str = "http://127.0.0.1:1";

/// A mainnet-like `/eth/v1/config/spec` payload covering every normalization rule.
#[must_use]
pub fn create_test_spec() -> Value {
    json!({
        "CONFIG_NAME": "mainnet",
        "PRESET_BASE": "mainnet",
        "SECONDS_PER_SLOT": "12",
        "SLOTS_PER_EPOCH": "32",
        "GENESIS_DELAY": "604800",
        "MIN_GENESIS_TIME": "1606824000",
        "GENESIS_FORK_VERSION": "0x00000000",
        "ELECTRA_FORK_VERSION": "0x05000000",
        "ELECTRA_FORK_EPOCH": "364032",
        "DOMAIN_BEACON_PROPOSER": "0x00000000",
        "DOMAIN_DEPOSIT": "0x03000000",
        "DEPOSIT_CONTRACT_ADDRESS": "0x00000000219ab540356cBB839Cbe05303d7705Fa",
        "TERMINAL_TOTAL_DIFFICULTY": "58750000000000000000000",
        "INACTIVITY_SCORE_BIAS": "0",
        "BLOB_SCHEDULE": [
            { "EPOCH": "364032", "MAX_BLOBS_PER_BLOCK": "9" }
        ]
    })
}

#[must_use]
pub fn create_test_withdrawal(validator_index: u64) -> Value {
    json!({
        "validator_index": validator_index.to_string(),
        "amount": "1000000000",
        "withdrawable_epoch": "364100"
    })
}

#[must_use]
pub fn create_test_consolidation(source_index: u64, target_index: u64) -> Value {
    json!({
        "source_index": source_index.to_string(),
        "target_index": target_index.to_string()
    })
}

/// HTTP settings without retries, so each mocked request is hit exactly once.
#[must_use]
pub fn test_http_config() -> HttpClientConfig {
    HttpClientConfig { max_retries: 0, connect_timeout_seconds: 1, ..HttpClientConfig::default() }
}

/// Creates an HTTP beacon client named `name` for the node at `url`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn create_beacon_client(name: &str, url: &str) -> Arc<dyn ConsensusClient> {
    let http = HttpClient::with_config(test_http_config()).expect("http client");
    Arc::new(BeaconHttpClient::new(name, url, Arc::new(http), Duration::from_secs(2)))
}

/// Creates a multi-node client over `(name, url)` pairs, in order.
#[must_use]
#[allow(clippy::expect_used)]
pub fn create_multi_client(nodes: &[(&str, &str)]) -> MultiClient {
    nodes
        .iter()
        .fold(MultiClient::builder(), |builder, (name, url)| {
            builder.client(create_beacon_client(name, url))
        })
        .build()
        .expect("multi client")
}
