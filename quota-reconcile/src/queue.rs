use dashmap::DashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Per-key single-flight coalescing (§5, §9 "per-object-key serialization"):
/// at most one reconciliation in flight per key; a re-enqueue that arrives
/// while one is running is coalesced into a single follow-up rather than
/// queued twice.
pub struct SingleFlightQueue<K> {
    in_flight: DashSet<K>,
    requeue: DashSet<K>,
}

impl<K> SingleFlightQueue<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            in_flight: DashSet::new(),
            requeue: DashSet::new(),
        }
    }

    /// Call when `key` is observed (enqueued or re-enqueued). Returns
    /// `true` if the caller should start a reconcile now; `false` means a
    /// reconcile is already running and this arrival has been coalesced
    /// into its follow-up.
    pub fn try_start(&self, key: &K) -> bool {
        if self.in_flight.insert(key.clone()) {
            true
        } else {
            self.requeue.insert(key.clone());
            false
        }
    }

    /// Call when the reconcile for `key` finishes. Returns `true` if a
    /// coalesced follow-up arrived while it ran and the caller should
    /// reconcile again immediately.
    pub fn finish(&self, key: &K) -> bool {
        self.in_flight.remove(key);
        self.requeue.remove(key).is_some()
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.in_flight.contains(key)
    }
}

impl<K> Default for SingleFlightQueue<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Routes a bucket identity to a fixed queue shard (§5 "funneling all
/// claim-request work items that target the same bucket identity through
/// the same queue shard"). `worker_count` must be > 0.
pub fn shard_for(bucket_identity: &str, worker_count: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    bucket_identity.hash(&mut hasher);
    (hasher.finish() % worker_count as u64) as usize
}
