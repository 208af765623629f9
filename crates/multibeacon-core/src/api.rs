//! Typed Beacon API over a pool of upstream nodes.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use crate::{
    spec::{SpecCache, SpecMap, SpecSource},
    types::{
        ApiResponse, PendingConsolidation, PendingConsolidationsOpts, PendingPartialWithdrawal,
        PendingPartialWithdrawalsOpts, SpecOpts,
    },
    upstream::{
        Capability, ClientPool, DispatchError, Dispatcher, HealthMonitor, MultiClientBuilder,
        RawSpec, RequestContext,
    },
};

/// A beacon node client backed by several upstream nodes.
///
/// Each request is dispatched across the active clients of the pool. The chain spec is
/// fetched once and served from the cache afterwards.
pub struct MultiClient {
    dispatcher: Arc<Dispatcher>,
    spec_cache: Arc<SpecCache>,
}

impl MultiClient {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>, spec_cache: Arc<SpecCache>) -> Self {
        Self { dispatcher, spec_cache }
    }

    #[must_use]
    pub fn builder() -> MultiClientBuilder {
        MultiClientBuilder::new()
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<ClientPool> {
        self.dispatcher.pool()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn spec_cache(&self) -> &Arc<SpecCache> {
        &self.spec_cache
    }

    /// A monitor that reinstates inactive clients of this client's pool.
    #[must_use]
    pub fn health_monitor(&self, interval: Duration, probe_timeout: Duration) -> HealthMonitor {
        HealthMonitor::new(Arc::clone(self.pool()), interval, probe_timeout)
    }

    /// Returns the normalized chain spec.
    ///
    /// The first successful call fetches `/eth/v1/config/spec` from the first capable
    /// client that answers; later calls are served from the cache.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Aggregated`] if no client could provide the spec, or
    /// [`DispatchError::Cancelled`] if `ctx` ends first.
    pub async fn spec(
        &self,
        ctx: &RequestContext,
        opts: &SpecOpts,
    ) -> Result<ApiResponse<Arc<SpecMap>>, DispatchError> {
        let ctx = ctx.child(opts.common.timeout);
        let source = DispatchedSpecSource { dispatcher: &self.dispatcher, opts };
        self.spec_cache.get_spec(&ctx, &source).await
    }

    /// Returns the pending partial withdrawals of a state.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidOptions`] without contacting any node if no state
    /// is given, otherwise the dispatch failure.
    pub async fn pending_partial_withdrawals(
        &self,
        ctx: &RequestContext,
        opts: &PendingPartialWithdrawalsOpts,
    ) -> Result<ApiResponse<Vec<PendingPartialWithdrawal>>, DispatchError> {
        require_state(&opts.state)?;
        let ctx = ctx.child(opts.common.timeout);

        self.dispatcher
            .dispatch_with_capability(
                &ctx,
                Capability::PendingPartialWithdrawals,
                |ctx, client| async move {
                    client
                        .require_pending_partial_withdrawals()?
                        .pending_partial_withdrawals(&ctx, opts)
                        .await
                },
                None,
            )
            .await
    }

    /// Returns the pending consolidations of a state.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidOptions`] without contacting any node if no state
    /// is given, otherwise the dispatch failure.
    pub async fn pending_consolidations(
        &self,
        ctx: &RequestContext,
        opts: &PendingConsolidationsOpts,
    ) -> Result<ApiResponse<Vec<PendingConsolidation>>, DispatchError> {
        require_state(&opts.state)?;
        let ctx = ctx.child(opts.common.timeout);

        self.dispatcher
            .dispatch_with_capability(
                &ctx,
                Capability::PendingConsolidations,
                |ctx, client| async move {
                    client
                        .require_pending_consolidations()?
                        .pending_consolidations(&ctx, opts)
                        .await
                },
                None,
            )
            .await
    }
}

fn require_state(state: &str) -> Result<(), DispatchError> {
    if state.is_empty() {
        return Err(DispatchError::InvalidOptions("no state specified".to_string()));
    }
    Ok(())
}

/// Fetches the raw spec by dispatching across the pool.
struct DispatchedSpecSource<'a> {
    dispatcher: &'a Dispatcher,
    opts: &'a SpecOpts,
}

#[async_trait]
impl<'a> SpecSource for DispatchedSpecSource<'a> {
    async fn load_spec(
        &self,
        ctx: &RequestContext,
    ) -> Result<ApiResponse<RawSpec>, DispatchError> {
        let opts = self.opts;
        self.dispatcher
            .dispatch_with_capability(
                ctx,
                Capability::Spec,
                |ctx, client| async move { client.require_spec()?.fetch_spec(&ctx, opts).await },
                None,
            )
            .await
    }
}
