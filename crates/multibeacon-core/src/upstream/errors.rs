use std::{fmt, sync::Arc};
use thiserror::Error;

use super::client::Capability;

/// Errors from a single upstream client attempt.
///
/// These are recorded per client by the dispatcher and are never fatal to a dispatch on
/// their own; they only surface to callers inside an [`AggregatedFailure`] or when a
/// component talks to one client directly.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Request exceeded the configured timeout duration.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the upstream node.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx HTTP status.
    ///
    /// First field is the HTTP status code, second is the node's error message.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// Network-level error from the underlying HTTP client.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Maximum concurrent requests limit has been reached.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),

    /// The selected client does not provide the requested operation.
    #[error("Client does not support {0}")]
    Unsupported(Capability),
}

impl UpstreamError {
    /// Returns `true` if retrying on the same or another node may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout |
            Self::Network(_) |
            Self::ConnectionFailed(_) |
            Self::ConcurrencyLimit(_) => true,
            Self::HttpError(status, _) => (500..=599).contains(status) || *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this failure should take the client out of rotation.
    ///
    /// Capability absence and 4xx client errors (other than 429) describe the request,
    /// not the node, so they leave the client active.
    #[must_use]
    pub fn should_deactivate(&self) -> bool {
        match self {
            Self::Unsupported(_) => false,
            Self::HttpError(status, _) => !((400..=499).contains(status) && *status != 429),
            _ => true,
        }
    }
}

/// One client's failure inside an aggregated error.
#[derive(Debug)]
pub struct ClientFailure {
    pub client: Arc<str>,
    pub error: UpstreamError,
}

impl fmt::Display for ClientFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.client, self.error)
    }
}

/// Every candidate failed. Keeps each failure with its originating client, in the order
/// the failures were observed.
#[derive(Debug, Default)]
pub struct AggregatedFailure {
    pub failures: Vec<ClientFailure>,
}

impl AggregatedFailure {
    pub fn push(&mut self, client: Arc<str>, error: UpstreamError) {
        self.failures.push(ClientFailure { client, error });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Names of the clients that failed.
    pub fn clients(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.client.as_ref())
    }
}

impl fmt::Display for AggregatedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no active upstream clients");
        }
        write!(f, "all {} upstream clients failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

/// Errors returned to callers of the dispatcher, the spec cache and the typed API.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DispatchError {
    /// Caller passed missing or invalid options. Raised before any network activity.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Every candidate failed, or there were no active candidates.
    #[error("{0}")]
    Aggregated(AggregatedFailure),

    /// The request context was cancelled or its deadline expired.
    #[error("Request cancelled")]
    Cancelled,

    /// The reconciliation policy rejected the collected results.
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// A single-source request (one client, no pool) failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl DispatchError {
    /// Returns the per-client failures if this is an aggregated failure.
    #[must_use]
    pub fn failures(&self) -> Option<&AggregatedFailure> {
        match self {
            Self::Aggregated(failures) => Some(failures),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
