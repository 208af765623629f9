//! Builder pattern for constructing a [`MultiClient`] from clients or configuration.

use std::sync::Arc;
use thiserror::Error;

use super::{
    beacon::BeaconHttpClient,
    client::ConsensusClient,
    dispatch::{DispatchConfig, Dispatcher},
    http_client::{HttpClient, HttpClientConfig},
    pool::{ClientPool, PoolError},
};
use crate::{
    api::MultiClient,
    config::{AppConfig, UpstreamProvider},
    spec::SpecCache,
};

/// Errors that can occur during client construction.
#[derive(Debug, Error)]
pub enum BuilderError {
    /// HTTP client initialization failed
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(String),

    /// Neither explicit clients nor upstream providers were given
    #[error("At least one upstream client is required")]
    NoClients,

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Builder for constructing a [`MultiClient`].
///
/// Explicit clients come first in dispatch order, followed by HTTP clients for the
/// configured providers. All HTTP clients share one connection pool and concurrency limit.
///
/// # Examples
///
/// ```no_run
/// # use multibeacon_core::{config::AppConfig, upstream::MultiClientBuilder};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load()?;
/// let client = MultiClientBuilder::new().from_config(&config).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct MultiClientBuilder {
    clients: Vec<Arc<dyn ConsensusClient>>,
    providers: Vec<UpstreamProvider>,
    dispatch_config: DispatchConfig,
    http_config: HttpClientConfig,
    spec_cache: Option<Arc<SpecCache>>,
}

impl MultiClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an already constructed client.
    #[must_use]
    pub fn client(mut self, client: Arc<dyn ConsensusClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Adds an HTTP client for a beacon node.
    #[must_use]
    pub fn provider(mut self, provider: UpstreamProvider) -> Self {
        self.providers.push(provider);
        self
    }

    #[must_use]
    pub fn dispatch_config(mut self, config: DispatchConfig) -> Self {
        self.dispatch_config = config;
        self
    }

    #[must_use]
    pub fn http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Shares an existing spec cache (default: a fresh cache per client).
    #[must_use]
    pub fn spec_cache(mut self, cache: Arc<SpecCache>) -> Self {
        self.spec_cache = Some(cache);
        self
    }

    /// Takes providers, dispatch and HTTP settings from `config`.
    #[must_use]
    pub fn from_config(mut self, config: &AppConfig) -> Self {
        self.providers.extend(config.upstreams.providers.iter().cloned());
        self.dispatch_config = config.dispatch.clone();
        self.http_config = config.http.clone();
        self
    }

    /// Builds the [`MultiClient`].
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::NoClients` if no client or provider was given.
    /// Returns `BuilderError::HttpClientInit` if HTTP client initialization fails.
    /// Returns `BuilderError::Pool` if two clients share a name.
    pub fn build(self) -> Result<MultiClient, BuilderError> {
        if self.clients.is_empty() && self.providers.is_empty() {
            return Err(BuilderError::NoClients);
        }

        let pool = ClientPool::with_clients(self.clients)?;

        if !self.providers.is_empty() {
            let http = Arc::new(
                HttpClient::with_config(self.http_config)
                    .map_err(|e| BuilderError::HttpClientInit(e.to_string()))?,
            );
            for provider in self.providers {
                let timeout = provider.timeout();
                pool.add(Arc::new(BeaconHttpClient::new(
                    provider.name,
                    provider.address,
                    Arc::clone(&http),
                    timeout,
                )))?;
            }
        }

        let dispatcher = Arc::new(Dispatcher::new(Arc::new(pool), self.dispatch_config));
        let spec_cache = self.spec_cache.unwrap_or_default();

        Ok(MultiClient::new(dispatcher, spec_cache))
    }
}
