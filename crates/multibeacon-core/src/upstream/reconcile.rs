//! Agreement-based reconciliation of answers from several clients.

use std::sync::Arc;
use tracing::{debug, warn};

use super::dispatch::{ClientResult, ReconciliationPolicy};

/// Collects up to `max_count` answers and accepts the most common one if at least
/// `min_count` clients returned it.
///
/// Answers are compared with `PartialEq`. When two groups are the same size the one
/// whose first answer arrived earlier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgreementPolicy {
    pub max_count: usize,
    pub min_count: usize,
}

impl AgreementPolicy {
    #[must_use]
    pub fn new(max_count: usize, min_count: usize) -> Self {
        Self { max_count, min_count }
    }

    /// Every collected answer must match.
    #[must_use]
    pub fn unanimous(count: usize) -> Self {
        Self::new(count, count)
    }

    /// More than half of `count` answers must match.
    #[must_use]
    pub fn majority(count: usize) -> Self {
        Self::new(count, count / 2 + 1)
    }
}

struct Group<T> {
    value: T,
    clients: Vec<Arc<str>>,
}

impl<T: PartialEq + Send + Sync> ReconciliationPolicy<T> for AgreementPolicy {
    fn quorum(&self) -> usize {
        self.max_count.max(1)
    }

    fn reconcile(&self, results: Vec<ClientResult<T>>) -> Result<T, String> {
        let total = results.len();
        let mut groups: Vec<Group<T>> = Vec::new();

        for result in results {
            match groups.iter_mut().find(|g| g.value == result.value) {
                Some(group) => group.clients.push(result.client),
                None => groups.push(Group { value: result.value, clients: vec![result.client] }),
            }
        }

        if groups.is_empty() {
            return Err("no results to reconcile".to_string());
        }

        // First of the largest groups, so ties go to the earliest answer
        let mut best = 0;
        for (i, group) in groups.iter().enumerate() {
            if group.clients.len() > groups[best].clients.len() {
                best = i;
            }
        }
        let winner = groups.swap_remove(best);
        let agreeing = winner.clients.len();

        for group in &groups {
            let clients: Vec<&str> = group.clients.iter().map(AsRef::as_ref).collect();
            warn!(clients = ?clients, agreeing, total, "clients disagree with majority answer");
        }

        if agreeing < self.min_count {
            return Err(format!(
                "{agreeing} of {total} clients agree, {} required",
                self.min_count
            ));
        }

        debug!(agreeing, total, "answers reconciled");
        Ok(winner.value)
    }
}
