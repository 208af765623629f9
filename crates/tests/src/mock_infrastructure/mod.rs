//! Mock Infrastructure for Testing Multibeacon
//!
//! This module provides reusable mock beacon nodes for testing upstream interactions
//! without requiring a running consensus client.
//!
//! ## Components
//!
//! - `BeaconMockBuilder`: Wraps mockito to serve Beacon API envelopes
//! - Test helpers for fixtures and client construction
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::{create_test_spec, BeaconMockBuilder};
//!
//! let mut node = BeaconMockBuilder::new().await;
//! node.mock_spec(&create_test_spec(), 1);
//!
//! // Use node.url() as the beacon node address
//! ```

pub mod beacon_mock;
pub mod test_helpers;

pub use beacon_mock::BeaconMockBuilder;
pub use test_helpers::*;
