use reqwest::{header::HeaderMap, Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::upstream::UpstreamError;

/// Response header carrying the fork name of the returned object.
pub const CONSENSUS_VERSION_HEADER: &str = "Eth-Consensus-Version";

/// Maximum length of an upstream error message kept in [`UpstreamError::HttpError`].
const MAX_ERROR_BODY: usize = 256;

/// Configuration for HTTP client concurrency, timeouts and retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent HTTP requests allowed
    #[serde(default = "default_concurrent_limit")]
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds under normal load
    #[serde(default = "default_permit_timeout_ms")]
    pub permit_timeout_ms: u64,
    /// Permit acquisition timeout in milliseconds when permits are scarce
    #[serde(default = "default_permit_timeout_scarce_ms")]
    pub permit_timeout_scarce_ms: u64,
    /// Number of available permits below which they are considered scarce
    #[serde(default = "default_scarce_permit_threshold")]
    pub scarce_permit_threshold: usize,
    /// Extra attempts after a 5xx response or a transport error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

fn default_concurrent_limit() -> usize {
    256
}

fn default_permit_timeout_ms() -> u64 {
    500
}

fn default_permit_timeout_scarce_ms() -> u64 {
    200
}

fn default_scarce_permit_threshold() -> usize {
    16
}

fn default_max_retries() -> u32 {
    2
}

fn default_connect_timeout_seconds() -> u64 {
    5
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: default_concurrent_limit(),
            permit_timeout_ms: default_permit_timeout_ms(),
            permit_timeout_scarce_ms: default_permit_timeout_scarce_ms(),
            scarce_permit_threshold: default_scarce_permit_threshold(),
            max_retries: default_max_retries(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Value of the `Eth-Consensus-Version` header, if present.
    pub consensus_version: Option<String>,
    pub body: bytes::Bytes,
}

/// HTTP client with semaphore-based concurrency control.
///
/// One instance is shared by every upstream client built from the same configuration,
/// so the concurrency limit applies across all beacon nodes.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

/// RAII guard ensuring semaphore permits are always released.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }

    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "permit guard dropped"
        );
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::limited(3))
            .user_agent(concat!("multibeacon/", env!("CARGO_PKG_VERSION")))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Sanitizes network errors to prevent information disclosure.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_redirect() {
            "too many redirects".to_string()
        } else {
            "network error".to_string()
        }
    }

    /// Sends a `GET` for `path` on the node at `base`.
    ///
    /// 5xx responses and transport errors are retried up to `max_retries` times with
    /// exponential backoff while holding the same permit.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if permit acquisition or the request times out
    /// - [`UpstreamError::ConcurrencyLimit`] if the semaphore is closed
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes
    /// - [`UpstreamError::ConnectionFailed`] for transport failures
    /// - [`UpstreamError::Network`] if the body cannot be read
    pub async fn get(
        &self,
        base: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, UpstreamError> {
        let url = join_url(base, path);

        let permit_timeout =
            if self.concurrent_limit.available_permits() < self.config.scarce_permit_threshold {
                Duration::from_millis(self.config.permit_timeout_scarce_ms)
            } else {
                Duration::from_millis(self.config.permit_timeout_ms)
            };

        let permit = tokio::time::timeout(
            permit_timeout,
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                url = %url,
                available_permits = self.concurrent_limit.available_permits(),
                "http client semaphore acquisition timeout"
            );
            UpstreamError::Timeout
        })?
        .map_err(|_| {
            tracing::warn!(url = %url, "http client concurrency limit reached");
            UpstreamError::ConcurrencyLimit(url.clone())
        })?;

        let permit_guard = PermitGuard::new(permit, Arc::clone(&self.concurrent_limit));
        let mut retries = 0;

        loop {
            let result = self
                .client
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .timeout(timeout)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    let status = response.status();
                    let consensus_version = consensus_version(response.headers());
                    let body = response.bytes().await.map_err(UpstreamError::Network)?;
                    tracing::trace!(
                        url = %url,
                        status = status.as_u16(),
                        available_permits = permit_guard.available_permits(),
                        "http request completed"
                    );
                    return Ok(HttpResponse { status, consensus_version, body });
                }
                Ok(response)
                    if response.status().is_server_error() && retries < self.config.max_retries =>
                {
                    retries += 1;
                    tracing::debug!(
                        url = %url,
                        status = response.status().as_u16(),
                        retry = retries,
                        "retrying after server error"
                    );
                    tokio::time::sleep(backoff(retries)).await;
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let raw_text = response.text().await.unwrap_or_default();
                    return Err(UpstreamError::HttpError(status, error_message(&raw_text)));
                }
                Err(e) if !e.is_timeout() && retries < self.config.max_retries => {
                    retries += 1;
                    tracing::debug!(url = %url, retry = retries, "retrying after transport error");
                    tokio::time::sleep(backoff(retries)).await;
                }
                Err(e) => {
                    tracing::trace!(
                        available_permits = permit_guard.available_permits(),
                        "http request error"
                    );
                    if e.is_timeout() {
                        return Err(UpstreamError::Timeout);
                    }
                    return Err(UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e)));
                }
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

fn backoff(retry: u32) -> Duration {
    Duration::from_millis(100 * (1 << retry.min(6)))
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn consensus_version(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONSENSUS_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
}

/// Extracts the message of a Beacon API error body (`{"code": .., "message": ..}`),
/// falling back to the raw text, truncated to a bounded length.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct BeaconError {
        message: String,
    }

    let text = serde_json::from_str::<BeaconError>(body)
        .map_or_else(|_| body.trim().to_string(), |e| e.message);
    truncate(text)
}

fn truncate(mut text: String) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text;
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str("... (truncated)");
    text
}
