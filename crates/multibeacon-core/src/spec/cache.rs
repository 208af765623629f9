//! Process-wide chain spec cache.
//!
//! The chain configuration never changes for the life of a process, and fetching it is
//! comparatively expensive, so it is fetched once and shared as an `Arc<SpecMap>`.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{normalize_map, SpecMap, SpecValue};
use crate::{
    types::{ApiResponse, DomainType, SpecOpts},
    upstream::{
        client::{RawSpec, SpecProvider},
        context::RequestContext,
        errors::DispatchError,
    },
};

/// Domain types that not every node reports. Added when absent, never overriding a value
/// the node returned.
const DEFAULT_DOMAINS: [(&str, DomainType); 3] = [
    ("DOMAIN_APPLICATION_MASK", DomainType([0x00, 0x00, 0x00, 0x01])),
    ("DOMAIN_BLS_TO_EXECUTION_CHANGE", DomainType([0x0a, 0x00, 0x00, 0x00])),
    ("DOMAIN_APPLICATION_BUILDER", DomainType([0x00, 0x00, 0x00, 0x01])),
];

/// Where the cache gets the raw spec from on its first use.
#[async_trait]
pub trait SpecSource: Send + Sync {
    /// Fetches and decodes the raw `/eth/v1/config/spec` object.
    async fn load_spec(&self, ctx: &RequestContext)
        -> Result<ApiResponse<RawSpec>, DispatchError>;
}

/// Any single client that provides the spec can populate the cache on its own.
#[async_trait]
impl<P: SpecProvider + ?Sized> SpecSource for P {
    async fn load_spec(
        &self,
        ctx: &RequestContext,
    ) -> Result<ApiResponse<RawSpec>, DispatchError> {
        Ok(self.fetch_spec(ctx, &SpecOpts::default()).await?)
    }
}

/// Lifecycle of the cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No value yet, and no fetch in progress.
    Empty,
    /// A caller holds the write lock and is fetching.
    Fetching,
    /// The value is stored and will never change.
    Populated,
}

/// Lazily populated, single-write chain spec cache.
///
/// Readers take the shared lock and return the stored value when there is one. Otherwise
/// one caller takes the exclusive lock, re-checks, fetches and stores; everybody queued
/// behind it sees the stored value on their re-check. A failed or cancelled fetch leaves
/// the cache empty so the next caller tries again.
#[derive(Default)]
pub struct SpecCache {
    inner: RwLock<Option<Arc<SpecMap>>>,
    fetches: AtomicU64,
}

impl SpecCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chain spec, fetching it from `source` on first use.
    ///
    /// Metadata is returned only from the call that performed the fetch; cached hits carry
    /// empty metadata.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Cancelled`] if `ctx` is done before a value is available,
    /// or the error of the failed fetch. Neither is cached.
    pub async fn get_spec(
        &self,
        ctx: &RequestContext,
        source: &dyn SpecSource,
    ) -> Result<ApiResponse<Arc<SpecMap>>, DispatchError> {
        // Fast path: shared lock
        let cached = tokio::select! {
            biased;
            guard = self.inner.read() => guard.clone(),
            () = ctx.done() => return Err(DispatchError::Cancelled),
        };
        if let Some(spec) = cached {
            return Ok(ApiResponse::new(spec));
        }

        let mut guard = tokio::select! {
            biased;
            guard = self.inner.write() => guard,
            () = ctx.done() => return Err(DispatchError::Cancelled),
        };

        // Re-check: another caller may have populated it while we waited for the lock
        if let Some(spec) = guard.as_ref() {
            debug!("chain spec populated while waiting for lock");
            return Ok(ApiResponse::new(Arc::clone(spec)));
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        let fetched = tokio::select! {
            result = source.load_spec(ctx) => result,
            () = ctx.done() => Err(DispatchError::Cancelled),
        };

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "chain spec fetch failed");
                return Err(e);
            }
        };

        let mut spec = normalize_map(&response.data);
        for (key, domain) in DEFAULT_DOMAINS {
            spec.entry(key.to_string()).or_insert(SpecValue::Domain(domain));
        }

        let spec = Arc::new(spec);
        *guard = Some(Arc::clone(&spec));
        info!(keys = spec.len(), "chain spec cached");

        Ok(ApiResponse::with_metadata(spec, response.metadata))
    }

    /// Current lifecycle state. `Fetching` is reported while the exclusive lock is held.
    #[must_use]
    pub fn state(&self) -> CacheState {
        match self.inner.try_read() {
            Ok(guard) if guard.is_some() => CacheState::Populated,
            Ok(_) => CacheState::Empty,
            Err(_) => CacheState::Fetching,
        }
    }

    /// The stored value, if populated and not currently locked for writing.
    #[must_use]
    pub fn cached(&self) -> Option<Arc<SpecMap>> {
        self.inner.try_read().ok().and_then(|guard| guard.clone())
    }

    /// Number of remote fetches issued, including failed and cancelled ones.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}
