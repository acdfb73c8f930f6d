//! Bounded, recency-ordered set of recently handled file fingerprints.

use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;

pub const DEFAULT_HANDLED_FILES_LIMIT: usize = 500;

struct HandledFiles {
    /// Newest first.
    order: VecDeque<String>,
    members: HashSet<String>,
}

/// Fingerprints of recently handled files. Owned by one node; never global.
pub struct DedupCache {
    limit: usize,
    handled: Mutex<HandledFiles>,
}

impl DedupCache {
    /// Creates a cache holding at most `limit` fingerprints (at least one).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            handled: Mutex::new(HandledFiles {
                order: VecDeque::with_capacity(limit),
                members: HashSet::with_capacity(limit),
            }),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records a fingerprint. Returns `true` only when it was not already present.
    ///
    /// Once over the limit, the oldest fingerprint is evicted. Re-adding a present
    /// fingerprint does not refresh its position.
    pub async fn add(&self, fingerprint: &str) -> bool {
        let mut handled = self.handled.lock().await;
        if handled.members.contains(fingerprint) {
            return false;
        }

        handled.members.insert(fingerprint.to_string());
        handled.order.push_front(fingerprint.to_string());
        while handled.order.len() > self.limit {
            if let Some(evicted) = handled.order.pop_back() {
                handled.members.remove(&evicted);
            }
        }
        true
    }

    pub async fn contains(&self, fingerprint: &str) -> bool {
        self.handled.lock().await.members.contains(fingerprint)
    }

    pub async fn len(&self) -> usize {
        self.handled.lock().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLED_FILES_LIMIT)
    }
}
