//! Record-or-default client for tests.
//!
//! Every operation returns the responder set on the mock, or a default empty response
//! when none was set. Call counts are kept per operation so tests can assert how many
//! times dispatch reached a given client.

use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use super::{
    client::{
        ConsensusClient, PendingConsolidationsProvider, PendingPartialWithdrawalsProvider,
        RawSpec, SpecProvider,
    },
    context::RequestContext,
    errors::UpstreamError,
};
use crate::types::{
    ApiResponse, PendingConsolidation, PendingConsolidationsOpts, PendingPartialWithdrawal,
    PendingPartialWithdrawalsOpts, SpecOpts,
};

type Responder<T> = Arc<dyn Fn() -> Result<ApiResponse<T>, UpstreamError> + Send + Sync>;

/// A configurable in-memory [`ConsensusClient`].
pub struct MockClient {
    name: String,
    address: String,
    healthy: AtomicBool,
    provides_spec: bool,
    provides_withdrawals: bool,
    provides_consolidations: bool,
    spec: Option<Responder<RawSpec>>,
    withdrawals: Option<Responder<Vec<PendingPartialWithdrawal>>>,
    consolidations: Option<Responder<Vec<PendingConsolidation>>>,
    spec_calls: AtomicUsize,
    withdrawals_calls: AtomicUsize,
    consolidations_calls: AtomicUsize,
}

impl MockClient {
    /// A healthy client providing every operation with default responses.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: format!("mock://{name}"),
            name,
            healthy: AtomicBool::new(true),
            provides_spec: true,
            provides_withdrawals: true,
            provides_consolidations: true,
            spec: None,
            withdrawals: None,
            consolidations: None,
            spec_calls: AtomicUsize::new(0),
            withdrawals_calls: AtomicUsize::new(0),
            consolidations_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_spec(mut self, spec: RawSpec) -> Self {
        self.spec = Some(Arc::new(move || Ok(ApiResponse::new(spec.clone()))));
        self
    }

    #[must_use]
    pub fn with_spec_responder(
        mut self,
        responder: impl Fn() -> Result<ApiResponse<RawSpec>, UpstreamError> + Send + Sync + 'static,
    ) -> Self {
        self.spec = Some(Arc::new(responder));
        self
    }

    #[must_use]
    pub fn with_pending_partial_withdrawals(
        mut self,
        withdrawals: Vec<PendingPartialWithdrawal>,
    ) -> Self {
        self.withdrawals = Some(Arc::new(move || Ok(ApiResponse::new(withdrawals.clone()))));
        self
    }

    #[must_use]
    pub fn with_pending_consolidations(
        mut self,
        consolidations: Vec<PendingConsolidation>,
    ) -> Self {
        self.consolidations = Some(Arc::new(move || Ok(ApiResponse::new(consolidations.clone()))));
        self
    }

    /// Makes every operation fail with the error produced by `make_error`.
    #[must_use]
    pub fn failing(
        mut self,
        make_error: impl Fn() -> UpstreamError + Send + Sync + 'static,
    ) -> Self {
        let make_error = Arc::new(make_error);
        let e1 = Arc::clone(&make_error);
        let e2 = Arc::clone(&make_error);
        self.spec = Some(Arc::new(move || Err(e1())));
        self.withdrawals = Some(Arc::new(move || Err(e2())));
        self.consolidations = Some(Arc::new(move || Err(make_error())));
        self
    }

    /// Removes the spec capability.
    #[must_use]
    pub fn without_spec(mut self) -> Self {
        self.provides_spec = false;
        self
    }

    /// Removes the pending partial withdrawals capability.
    #[must_use]
    pub fn without_pending_partial_withdrawals(mut self) -> Self {
        self.provides_withdrawals = false;
        self
    }

    /// Removes the pending consolidations capability.
    #[must_use]
    pub fn without_pending_consolidations(mut self) -> Self {
        self.provides_consolidations = false;
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    #[must_use]
    pub fn spec_calls(&self) -> usize {
        self.spec_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn pending_partial_withdrawals_calls(&self) -> usize {
        self.withdrawals_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn pending_consolidations_calls(&self) -> usize {
        self.consolidations_calls.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ConsensusClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn is_healthy(&self, _ctx: &RequestContext) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    fn spec_provider(&self) -> Option<&dyn SpecProvider> {
        self.provides_spec.then_some(self as &dyn SpecProvider)
    }

    fn pending_partial_withdrawals_provider(
        &self,
    ) -> Option<&dyn PendingPartialWithdrawalsProvider> {
        self.provides_withdrawals.then_some(self as &dyn PendingPartialWithdrawalsProvider)
    }

    fn pending_consolidations_provider(&self) -> Option<&dyn PendingConsolidationsProvider> {
        self.provides_consolidations.then_some(self as &dyn PendingConsolidationsProvider)
    }
}

#[async_trait]
impl SpecProvider for MockClient {
    async fn fetch_spec(
        &self,
        _ctx: &RequestContext,
        _opts: &SpecOpts,
    ) -> Result<ApiResponse<RawSpec>, UpstreamError> {
        self.spec_calls.fetch_add(1, Ordering::AcqRel);
        match &self.spec {
            Some(responder) => responder(),
            None => Ok(ApiResponse::new(RawSpec::new())),
        }
    }
}

#[async_trait]
impl PendingPartialWithdrawalsProvider for MockClient {
    async fn pending_partial_withdrawals(
        &self,
        _ctx: &RequestContext,
        _opts: &PendingPartialWithdrawalsOpts,
    ) -> Result<ApiResponse<Vec<PendingPartialWithdrawal>>, UpstreamError> {
        self.withdrawals_calls.fetch_add(1, Ordering::AcqRel);
        match &self.withdrawals {
            Some(responder) => responder(),
            None => Ok(ApiResponse::new(Vec::new())),
        }
    }
}

#[async_trait]
impl PendingConsolidationsProvider for MockClient {
    async fn pending_consolidations(
        &self,
        _ctx: &RequestContext,
        _opts: &PendingConsolidationsOpts,
    ) -> Result<ApiResponse<Vec<PendingConsolidation>>, UpstreamError> {
        self.consolidations_calls.fetch_add(1, Ordering::AcqRel);
        match &self.consolidations {
            Some(responder) => responder(),
            None => Ok(ApiResponse::new(Vec::new())),
        }
    }
}
