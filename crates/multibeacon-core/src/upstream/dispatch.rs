//! Fan-out call dispatch across the active clients of a pool.
//!
//! A dispatch takes one snapshot of the pool, picks the active entries in pool order and
//! runs the caller's operation against them, either one after another (failover) or
//! several at once. Failing clients are taken out of rotation as their errors come in.
//! The outcome is the first success, a reconciled value when a
//! [`ReconciliationPolicy`] is given, or an [`AggregatedFailure`] naming every client
//! that was tried.

use arc_swap::ArcSwap;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, sync::Arc};
use tracing::{debug, info};

use super::{
    client::{Capability, ConsensusClient},
    context::RequestContext,
    errors::{AggregatedFailure, DispatchError, UpstreamError},
    pool::{ClientPool, PoolEntry},
};

/// How candidates are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One client at a time in pool order, moving on after each failure.
    #[default]
    Sequential,
    /// Up to `max_parallel` clients at once; the first outcomes to arrive are used.
    Parallel,
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Parallel => f.write_str("parallel"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,

    /// Maximum attempts in flight at once in parallel mode (default: 3)
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    3
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { mode: DispatchMode::default(), max_parallel: default_max_parallel() }
    }
}

/// A successful outcome tagged with the client that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResult<T> {
    pub client: Arc<str>,
    pub value: T,
}

/// Derives one answer from several successful ones.
pub trait ReconciliationPolicy<T>: Send + Sync {
    /// Number of successes to collect before reconciling. Values below one are treated
    /// as one.
    fn quorum(&self) -> usize;

    /// Picks the answer, or explains why none of `results` is acceptable.
    ///
    /// # Errors
    ///
    /// Returns a description of the disagreement when no answer can be chosen.
    fn reconcile(&self, results: Vec<ClientResult<T>>) -> Result<T, String>;
}

/// Runs operations against the active clients of a [`ClientPool`].
pub struct Dispatcher {
    pool: Arc<ClientPool>,
    config: ArcSwap<DispatchConfig>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(pool: Arc<ClientPool>, config: DispatchConfig) -> Self {
        Self { pool, config: ArcSwap::from_pointee(config) }
    }

    #[must_use]
    pub fn pool(&self) -> &Arc<ClientPool> {
        &self.pool
    }

    #[must_use]
    pub fn config(&self) -> DispatchConfig {
        (**self.config.load()).clone()
    }

    pub fn update_config(&self, config: DispatchConfig) {
        info!(mode = %config.mode, max_parallel = config.max_parallel, "dispatch config updated");
        self.config.store(Arc::new(config));
    }

    /// Runs `operation` against the active clients.
    ///
    /// Without a policy the first success is returned and any other attempts still in
    /// flight are dropped. With a policy, successes are collected until its quorum is
    /// reached or the candidates run out, and the policy picks the answer.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Aggregated`] when every candidate failed, listing each client
    ///   and its error; the list is empty when no client was active
    /// - [`DispatchError::Cancelled`] when `ctx` is done first; abandoned clients are
    ///   not deactivated
    /// - [`DispatchError::Reconciliation`] when the policy rejects the successes
    pub async fn dispatch<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        operation: F,
        policy: Option<&dyn ReconciliationPolicy<T>>,
    ) -> Result<T, DispatchError>
    where
        F: Fn(RequestContext, Arc<dyn ConsensusClient>) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let candidates = self.pool.active();
        self.run(ctx, candidates, AggregatedFailure::default(), operation, policy).await
    }

    /// Like [`dispatch`](Self::dispatch), but only clients providing `capability` are
    /// tried. Active clients without it are reported as
    /// [`UpstreamError::Unsupported`] in an aggregated failure and stay active.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch).
    pub async fn dispatch_with_capability<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        capability: Capability,
        operation: F,
        policy: Option<&dyn ReconciliationPolicy<T>>,
    ) -> Result<T, DispatchError>
    where
        F: Fn(RequestContext, Arc<dyn ConsensusClient>) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut skipped = AggregatedFailure::default();
        let (candidates, unsupported): (Vec<_>, Vec<_>) =
            self.pool.active().into_iter().partition(|entry| entry.supports(capability));

        for entry in unsupported {
            debug!(client = %entry.name(), capability = %capability, "client lacks capability");
            skipped.push(Arc::clone(entry.name()), UpstreamError::Unsupported(capability));
        }

        self.run(ctx, candidates, skipped, operation, policy).await
    }

    async fn run<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        candidates: Vec<Arc<PoolEntry>>,
        failures: AggregatedFailure,
        operation: F,
        policy: Option<&dyn ReconciliationPolicy<T>>,
    ) -> Result<T, DispatchError>
    where
        F: Fn(RequestContext, Arc<dyn ConsensusClient>) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        if ctx.is_done() {
            return Err(DispatchError::Cancelled);
        }

        let config = self.config.load_full();
        let mut outcome = Outcome { failures, successes: Vec::new(), policy };

        match config.mode {
            DispatchMode::Sequential => {
                for entry in candidates {
                    if ctx.is_done() {
                        return Err(DispatchError::Cancelled);
                    }
                    debug!(client = %entry.name(), "dispatching to client");
                    let attempt = operation(ctx.clone(), Arc::clone(entry.client()));
                    let result = tokio::select! {
                        biased;
                        () = ctx.done() => return Err(DispatchError::Cancelled),
                        result = attempt => result,
                    };
                    // A failure that lands with the deadline is the caller's, not the node's
                    if result.is_err() && ctx.is_done() {
                        return Err(DispatchError::Cancelled);
                    }
                    if let Some(done) = outcome.record(&self.pool, &entry, result) {
                        return done;
                    }
                }
            }
            DispatchMode::Parallel => {
                let launch = |entry: Arc<PoolEntry>| {
                    debug!(client = %entry.name(), "dispatching to client");
                    let attempt = operation(ctx.clone(), Arc::clone(entry.client()));
                    async move { (entry, attempt.await) }
                };

                let mut pending = candidates.into_iter();
                let mut in_flight: FuturesUnordered<_> =
                    pending.by_ref().take(config.max_parallel.max(1)).map(&launch).collect();

                loop {
                    let next = tokio::select! {
                        biased;
                        () = ctx.done() => return Err(DispatchError::Cancelled),
                        next = in_flight.next() => next,
                    };
                    let Some((entry, result)) = next else {
                        break;
                    };
                    if result.is_err() && ctx.is_done() {
                        return Err(DispatchError::Cancelled);
                    }
                    if let Some(done) = outcome.record(&self.pool, &entry, result) {
                        return done;
                    }
                    if ctx.is_done() {
                        return Err(DispatchError::Cancelled);
                    }
                    if let Some(entry) = pending.next() {
                        in_flight.push(launch(entry));
                    }
                }
            }
        }

        outcome.finish()
    }
}

/// Accumulated state of one dispatch.
struct Outcome<'p, T> {
    failures: AggregatedFailure,
    successes: Vec<ClientResult<T>>,
    policy: Option<&'p dyn ReconciliationPolicy<T>>,
}

impl<T> Outcome<'_, T> {
    /// Records one attempt. Returns the final result once the dispatch is decided.
    fn record(
        &mut self,
        pool: &ClientPool,
        entry: &PoolEntry,
        result: Result<T, UpstreamError>,
    ) -> Option<Result<T, DispatchError>> {
        match result {
            Ok(value) => {
                debug!(client = %entry.name(), "client call succeeded");
                let Some(policy) = self.policy else {
                    return Some(Ok(value));
                };
                self.successes.push(ClientResult { client: Arc::clone(entry.name()), value });
                (self.successes.len() >= policy.quorum().max(1))
                    .then(|| reconcile(policy, std::mem::take(&mut self.successes)))
            }
            Err(error) => {
                if error.should_deactivate() {
                    pool.deactivate(entry, &error);
                } else {
                    debug!(client = %entry.name(), error = %error, "client call rejected");
                }
                self.failures.push(Arc::clone(entry.name()), error);
                None
            }
        }
    }

    /// Decides the dispatch after every candidate has been tried.
    fn finish(self) -> Result<T, DispatchError> {
        match self.policy {
            Some(policy) if !self.successes.is_empty() => reconcile(policy, self.successes),
            _ => Err(DispatchError::Aggregated(self.failures)),
        }
    }
}

fn reconcile<T>(
    policy: &dyn ReconciliationPolicy<T>,
    successes: Vec<ClientResult<T>>,
) -> Result<T, DispatchError> {
    policy.reconcile(successes).map_err(DispatchError::Reconciliation)
}
