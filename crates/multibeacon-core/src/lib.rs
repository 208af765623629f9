//! # Multibeacon Core
//!
//! A beacon node client that spreads each request over several upstream nodes.
//!
//! This crate provides:
//!
//! - **[`upstream`]**: Client pool, fan-out dispatch with failover and optional
//!   reconciliation, the HTTP Beacon API client and the health monitor.
//!
//! - **[`spec`]**: Chain spec normalization into typed values and the process-wide spec
//!   cache, fetched once and shared.
//!
//! - **[`api`]**: [`MultiClient`](api::MultiClient), the typed API tying the two together.
//!
//! - **[`config`]**: Layered configuration (defaults, TOML file, environment).
//!
//! ## Request Flow
//!
//! ```text
//! MultiClient::spec ──► SpecCache ── hit ──► cached Arc<SpecMap>
//!                          │
//!                          miss (one caller fetches, others wait)
//!                          ▼
//! MultiClient::pending_* ─► Dispatcher ─► ClientPool (active, capable clients)
//!                              │
//!                              ▼
//!                        BeaconHttpClient ─► HttpClient ─► beacon node
//! ```

pub mod api;
pub mod config;
pub mod spec;
pub mod types;
pub mod upstream;

pub use api::MultiClient;
