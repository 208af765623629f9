//! The upstream client abstraction and its capability providers.
//!
//! A [`ConsensusClient`] is one handle to one beacon node. What it can serve is exposed
//! through explicit capability queries: each `*_provider()` accessor returns
//! `Some(&dyn Provider)` when the client implements that operation. Dispatch code asks
//! before calling instead of discovering the gap through a failed call.

use async_trait::async_trait;
use std::fmt;

use super::{context::RequestContext, errors::UpstreamError};
use crate::types::{
    ApiResponse, PendingConsolidation, PendingConsolidationsOpts, PendingPartialWithdrawal,
    PendingPartialWithdrawalsOpts, SpecOpts,
};

/// The undecoded chain spec object as returned by `/eth/v1/config/spec`.
pub type RawSpec = serde_json::Map<String, serde_json::Value>;

/// Operations a client may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Spec,
    PendingPartialWithdrawals,
    PendingConsolidations,
}

impl Capability {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spec => "spec",
            Self::PendingPartialWithdrawals => "pending_partial_withdrawals",
            Self::PendingConsolidations => "pending_consolidations",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetches the raw chain configuration.
#[async_trait]
pub trait SpecProvider: Send + Sync {
    async fn fetch_spec(
        &self,
        ctx: &RequestContext,
        opts: &SpecOpts,
    ) -> Result<ApiResponse<RawSpec>, UpstreamError>;
}

/// Fetches the pending partial withdrawals of a beacon state.
#[async_trait]
pub trait PendingPartialWithdrawalsProvider: Send + Sync {
    async fn pending_partial_withdrawals(
        &self,
        ctx: &RequestContext,
        opts: &PendingPartialWithdrawalsOpts,
    ) -> Result<ApiResponse<Vec<PendingPartialWithdrawal>>, UpstreamError>;
}

/// Fetches the pending consolidations of a beacon state.
#[async_trait]
pub trait PendingConsolidationsProvider: Send + Sync {
    async fn pending_consolidations(
        &self,
        ctx: &RequestContext,
        opts: &PendingConsolidationsOpts,
    ) -> Result<ApiResponse<Vec<PendingConsolidation>>, UpstreamError>;
}

/// One handle to an upstream beacon node.
#[async_trait]
pub trait ConsensusClient: Send + Sync {
    /// Unique label of this client within a pool.
    fn name(&self) -> &str;

    /// Address of the node, for logging.
    fn address(&self) -> &str;

    /// Lightweight liveness probe used to reinstate inactive clients.
    async fn is_healthy(&self, ctx: &RequestContext) -> bool;

    fn spec_provider(&self) -> Option<&dyn SpecProvider> {
        None
    }

    fn pending_partial_withdrawals_provider(
        &self,
    ) -> Option<&dyn PendingPartialWithdrawalsProvider> {
        None
    }

    fn pending_consolidations_provider(&self) -> Option<&dyn PendingConsolidationsProvider> {
        None
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Spec => self.spec_provider().is_some(),
            Capability::PendingPartialWithdrawals => {
                self.pending_partial_withdrawals_provider().is_some()
            }
            Capability::PendingConsolidations => self.pending_consolidations_provider().is_some(),
        }
    }
}

impl<'a> dyn ConsensusClient + 'a {
    /// Returns the spec provider or [`UpstreamError::Unsupported`].
    ///
    /// # Errors
    ///
    /// Fails when the client does not provide the spec operation.
    pub fn require_spec(&self) -> Result<&dyn SpecProvider, UpstreamError> {
        self.spec_provider().ok_or(UpstreamError::Unsupported(Capability::Spec))
    }

    /// # Errors
    ///
    /// Fails when the client does not provide pending partial withdrawals.
    pub fn require_pending_partial_withdrawals(
        &self,
    ) -> Result<&dyn PendingPartialWithdrawalsProvider, UpstreamError> {
        self.pending_partial_withdrawals_provider()
            .ok_or(UpstreamError::Unsupported(Capability::PendingPartialWithdrawals))
    }

    /// # Errors
    ///
    /// Fails when the client does not provide pending consolidations.
    pub fn require_pending_consolidations(
        &self,
    ) -> Result<&dyn PendingConsolidationsProvider, UpstreamError> {
        self.pending_consolidations_provider()
            .ok_or(UpstreamError::Unsupported(Capability::PendingConsolidations))
    }
}
