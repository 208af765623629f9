//! HTTP-backed upstream client for one beacon node.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::{sync::Arc, time::Duration};
use tracing::debug;

use super::{
    client::{
        ConsensusClient, PendingConsolidationsProvider, PendingPartialWithdrawalsProvider,
        RawSpec, SpecProvider,
    },
    codec::decode_response,
    context::RequestContext,
    errors::UpstreamError,
    http_client::HttpClient,
};
use crate::types::{
    ApiResponse, CommonOpts, PendingConsolidation, PendingConsolidationsOpts,
    PendingPartialWithdrawal, PendingPartialWithdrawalsOpts, SpecOpts,
};

const SPEC_PATH: &str = "/eth/v1/config/spec";
const HEALTH_PATH: &str = "/eth/v1/node/health";

/// Timeout of the health probe when the context carries no deadline.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A [`ConsensusClient`] talking to the Beacon API of one node over HTTP.
pub struct BeaconHttpClient {
    name: String,
    address: String,
    http: Arc<HttpClient>,
    timeout: Duration,
}

impl BeaconHttpClient {
    /// `timeout` bounds each request unless the call options or the context set a tighter
    /// one.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        http: Arc<HttpClient>,
        timeout: Duration,
    ) -> Self {
        Self { name: name.into(), address: address.into(), http, timeout }
    }

    fn request_timeout(&self, ctx: &RequestContext, common: &CommonOpts) -> Duration {
        let timeout = common.timeout.unwrap_or(self.timeout);
        ctx.remaining().map_or(timeout, |remaining| remaining.min(timeout))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        common: &CommonOpts,
        path: &str,
    ) -> Result<ApiResponse<T>, UpstreamError> {
        let timeout = self.request_timeout(ctx, common);
        debug!(
            client = %self.name,
            path = path,
            timeout = ?timeout,
            "beacon api request"
        );

        let response = self.http.get(&self.address, path, timeout).await?;
        decode_response(&response.body, response.consensus_version.as_deref())
    }
}

fn state_path(state: &str, endpoint: &str) -> String {
    format!("/eth/v1/beacon/states/{state}/{endpoint}")
}

#[async_trait]
impl ConsensusClient for BeaconHttpClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> &str {
        &self.address
    }

    /// Ready only on `200`; a syncing node answers `206` and is not used.
    async fn is_healthy(&self, ctx: &RequestContext) -> bool {
        let timeout = ctx.remaining().unwrap_or(DEFAULT_PROBE_TIMEOUT);
        match self.http.get(&self.address, HEALTH_PATH, timeout).await {
            Ok(response) => response.status == StatusCode::OK,
            Err(e) => {
                debug!(client = %self.name, error = %e, "health probe failed");
                false
            }
        }
    }

    fn spec_provider(&self) -> Option<&dyn SpecProvider> {
        Some(self)
    }

    fn pending_partial_withdrawals_provider(
        &self,
    ) -> Option<&dyn PendingPartialWithdrawalsProvider> {
        Some(self)
    }

    fn pending_consolidations_provider(&self) -> Option<&dyn PendingConsolidationsProvider> {
        Some(self)
    }
}

#[async_trait]
impl SpecProvider for BeaconHttpClient {
    async fn fetch_spec(
        &self,
        ctx: &RequestContext,
        opts: &SpecOpts,
    ) -> Result<ApiResponse<RawSpec>, UpstreamError> {
        self.get_json(ctx, &opts.common, SPEC_PATH).await
    }
}

#[async_trait]
impl PendingPartialWithdrawalsProvider for BeaconHttpClient {
    async fn pending_partial_withdrawals(
        &self,
        ctx: &RequestContext,
        opts: &PendingPartialWithdrawalsOpts,
    ) -> Result<ApiResponse<Vec<PendingPartialWithdrawal>>, UpstreamError> {
        let path = state_path(&opts.state, "pending_partial_withdrawals");
        self.get_json(ctx, &opts.common, &path).await
    }
}

#[async_trait]
impl PendingConsolidationsProvider for BeaconHttpClient {
    async fn pending_consolidations(
        &self,
        ctx: &RequestContext,
        opts: &PendingConsolidationsOpts,
    ) -> Result<ApiResponse<Vec<PendingConsolidation>>, UpstreamError> {
        let path = state_path(&opts.state, "pending_consolidations");
        self.get_json(ctx, &opts.common, &path).await
    }
}
