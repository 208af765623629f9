use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tokio::{sync::broadcast, time::interval};
use tracing::{debug, info};

use super::{context::RequestContext, pool::ClientPool};

/// Periodically probes inactive clients and returns the ones that answer to rotation.
///
/// Dispatch only ever takes clients out of rotation; this monitor is what brings them
/// back. Active clients are not probed.
pub struct HealthMonitor {
    pool: Arc<ClientPool>,
    check_interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    #[must_use]
    pub fn new(pool: Arc<ClientPool>, check_interval: Duration, probe_timeout: Duration) -> Self {
        Self { pool, check_interval, probe_timeout }
    }

    #[must_use]
    pub fn start_with_shutdown(
        &self,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let monitor = Self {
            pool: Arc::clone(&self.pool),
            check_interval: self.check_interval,
            probe_timeout: self.probe_timeout,
        };

        tokio::spawn(async move {
            let mut interval = interval(monitor.check_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        monitor.check_inactive().await;
                    }
                    _ = shutdown_rx.recv() => {
                        info!("health monitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Probes every inactive client once, concurrently. Returns how many were reactivated.
    pub async fn check_inactive(&self) -> usize {
        let inactive = self.pool.inactive();
        if inactive.is_empty() {
            return 0;
        }

        let probes = inactive.iter().map(|entry| async move {
            let ctx = RequestContext::with_timeout(self.probe_timeout);
            let healthy = tokio::time::timeout(self.probe_timeout, entry.client().is_healthy(&ctx))
                .await
                .unwrap_or(false);
            (entry, healthy)
        });

        let mut reactivated = 0;
        for (entry, healthy) in join_all(probes).await {
            if healthy {
                if self.pool.reactivate(entry.name()) {
                    reactivated += 1;
                }
            } else {
                debug!(client = %entry.name(), "inactive client still unhealthy");
            }
        }
        reactivated
    }
}
