//! Integration Tests for Multibeacon
//!
//! This crate contains various test modules:
//!
//! - `spec_tests`: Chain spec fetching, normalization and caching over HTTP
//! - `dispatch_tests`: Failover, error classification and decoding of state endpoints
//! - `health_tests`: Reinstatement of recovered nodes by the health monitor
//! - `config_tests`: Layered configuration loading with environment overrides
//! - `mock_infrastructure`: Reusable mock beacon nodes (mockito)
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```
//!
//! No beacon node is needed: every node is a local mockito server, and dead nodes are
//! addresses nothing listens on.

#[cfg(test)]
mod spec_tests;

#[cfg(test)]
mod dispatch_tests;

#[cfg(test)]
mod health_tests;

#[cfg(test)]
mod config_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
