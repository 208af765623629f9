//! The ordered set of upstream clients and their active/inactive state.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use thiserror::Error;
use tracing::{info, warn};

use super::{
    client::{Capability, ConsensusClient},
    errors::UpstreamError,
};

#[derive(Debug, Error)]
pub enum PoolError {
    /// A client with this name is already registered.
    #[error("Duplicate upstream client: {0}")]
    Duplicate(String),
}

/// One client in the pool with its health flag.
///
/// Entries are never removed. A deactivated entry stays in place so it keeps its
/// position in iteration order when it is reinstated.
pub struct PoolEntry {
    name: Arc<str>,
    client: Arc<dyn ConsensusClient>,
    active: AtomicBool,
    failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl PoolEntry {
    fn new(client: Arc<dyn ConsensusClient>) -> Self {
        Self {
            name: Arc::from(client.name()),
            client,
            active: AtomicBool::new(true),
            failures: AtomicU64::new(0),
            last_error: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn ConsensusClient> {
        &self.client
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Total failures recorded against this client since it was added.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Text of the failure that last deactivated this client.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.client.supports(capability)
    }
}

/// Ordered pool of upstream clients, unique by name.
///
/// The entry list lives in an `ArcSwap`, so dispatch takes a lock-free snapshot whose
/// order cannot change underneath it. Health flags are atomics on the entries;
/// flipping one never rebuilds the list.
pub struct ClientPool {
    entries: ArcSwap<Vec<Arc<PoolEntry>>>,
}

impl Default for ClientPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientPool {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: ArcSwap::from_pointee(Vec::new()) }
    }

    /// Builds a pool from clients in order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Duplicate`] if two clients share a name.
    pub fn with_clients(
        clients: impl IntoIterator<Item = Arc<dyn ConsensusClient>>,
    ) -> Result<Self, PoolError> {
        let pool = Self::new();
        for client in clients {
            pool.add(client)?;
        }
        Ok(pool)
    }

    /// Appends a client. New clients start active.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Duplicate`] if a client with the same name exists.
    pub fn add(&self, client: Arc<dyn ConsensusClient>) -> Result<(), PoolError> {
        let entry = Arc::new(PoolEntry::new(client));
        let mut duplicate = false;

        self.entries.rcu(|current| {
            duplicate = current.iter().any(|e| e.name == entry.name);
            if duplicate {
                return Arc::clone(current);
            }
            let mut next = (**current).clone();
            next.push(Arc::clone(&entry));
            Arc::new(next)
        });

        if duplicate {
            return Err(PoolError::Duplicate(entry.name.to_string()));
        }
        info!(client = %entry.name, address = %entry.client.address(), "added upstream client");
        Ok(())
    }

    /// Returns a consistent snapshot of all entries in pool order.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Arc<PoolEntry>>> {
        self.entries.load_full()
    }

    /// Active entries of one snapshot, in pool order.
    #[must_use]
    pub fn active(&self) -> Vec<Arc<PoolEntry>> {
        self.snapshot().iter().filter(|e| e.is_active()).cloned().collect()
    }

    /// Inactive entries of one snapshot, in pool order.
    #[must_use]
    pub fn inactive(&self) -> Vec<Arc<PoolEntry>> {
        self.snapshot().iter().filter(|e| !e.is_active()).cloned().collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<PoolEntry>> {
        self.snapshot().iter().find(|e| e.name.as_ref() == name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.load().iter().filter(|e| e.is_active()).count()
    }

    /// Marks a client inactive after a failure. Returns `true` if this call changed the
    /// state.
    pub fn deactivate(&self, entry: &PoolEntry, error: &UpstreamError) -> bool {
        entry.failures.fetch_add(1, Ordering::Relaxed);
        *entry.last_error.lock() = Some(error.to_string());

        let changed = entry.active.swap(false, Ordering::AcqRel);
        if changed {
            warn!(
                client = %entry.name,
                error = %error,
                active = self.active_count(),
                "deactivated upstream client"
            );
        }
        changed
    }

    /// Returns a client to rotation. Returns `true` if this call changed the state.
    pub fn reactivate(&self, name: &str) -> bool {
        let Some(entry) = self.get(name) else {
            return false;
        };

        let changed = !entry.active.swap(true, Ordering::AcqRel);
        if changed {
            info!(
                client = %entry.name,
                active = self.active_count(),
                "reactivated upstream client"
            );
        }
        changed
    }
}
