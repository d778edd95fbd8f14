use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Pessimistic lock per entity key.
///
/// Mutations of the same key run one at a time; different keys proceed
/// concurrently. Nothing is held across keys, so sweeps that visit many keys
/// never block the whole store.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Clone + Eq + Hash> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// The slot for `key` is dropped from the map once no other caller holds
    /// or waits on it, so the map only tracks keys currently in use.
    pub fn with_lock<T>(&self, key: &K, f: impl FnOnce() -> T) -> T {
        // Both mutexes guard no data of their own, so a poisoned lock is
        // still safe to reuse.
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let out = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken and released under `slots`, so the count is exact.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
        drop(slot);
        out
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
