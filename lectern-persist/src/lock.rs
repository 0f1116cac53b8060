//! Lazily created per-key mutual exclusion.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Map from key to a lock handle.
///
/// Exactly one lock exists per key. Locks are created on first use and
/// kept for the lifetime of the map, so the map grows with the number of
/// distinct keys touched, not with request volume.
#[derive(Debug)]
pub struct LockMap<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> LockMap<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the lock for `key`, inserting it if absent.
    pub fn get(&self, key: &K) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .lock()
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Number of keys that have a lock.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for LockMap<K> {
    fn default() -> Self {
        Self::new()
    }
}
