//! Upstream beacon node clients and fan-out dispatch.
//!
//! This module handles communication with upstream beacon nodes, including:
//! - The [`ConsensusClient`] handle and its optional per-operation providers
//! - An ordered [`ClientPool`] with per-client active flags
//! - The [`Dispatcher`], which runs one logical call across the active clients
//! - HTTP transport, envelope decoding and the [`BeaconHttpClient`]
//! - Health probing of inactive clients
//!
//! # Dispatch
//!
//! ```text
//! call ─► [ctx done?] ── yes ──► Cancelled
//!             │
//!             no
//!             ▼
//!   active clients with capability (pool order)
//!             │
//!     ┌───────┴────────┐
//!     ▼                ▼
//! Sequential       Parallel (max_parallel in flight)
//!     │                │
//!     └───────┬────────┘
//!             ▼
//!   success ─► policy? ── no ──► first success
//!             │
//!             yes ─► collect quorum ─► reconcile
//!
//!   failure ─► deactivate client (except Unsupported and 4xx) ─► next candidate
//!   all failed ─► Aggregated { client, error } list
//! ```

pub mod beacon;
pub mod builder;
pub mod client;
pub mod codec;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod health;
pub mod http_client;
pub mod mock;
pub mod pool;
pub mod reconcile;

pub use beacon::BeaconHttpClient;
pub use builder::{BuilderError, MultiClientBuilder};
pub use client::{
    Capability, ConsensusClient, PendingConsolidationsProvider,
    PendingPartialWithdrawalsProvider, RawSpec, SpecProvider,
};
pub use codec::{decode_response, VERSION_METADATA_KEY};
pub use context::RequestContext;
pub use dispatch::{ClientResult, DispatchConfig, DispatchMode, Dispatcher, ReconciliationPolicy};
pub use errors::{AggregatedFailure, ClientFailure, DispatchError, UpstreamError};
pub use health::HealthMonitor;
pub use http_client::{HttpClient, HttpClientConfig, HttpResponse};
pub use mock::MockClient;
pub use pool::{ClientPool, PoolEntry, PoolError};
pub use reconcile::AgreementPolicy;
