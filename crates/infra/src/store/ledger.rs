use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use destore_core::DomainResult;

use super::poisoned;

/// Append-only log of facts per entity key, in commit order.
///
/// Entries are never updated or removed.
#[derive(Debug)]
pub struct LedgerLog<K, V> {
    name: &'static str,
    entries: RwLock<HashMap<K, Vec<V>>>,
}

impl<K, V> LedgerLog<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn append(&self, key: K, entry: V) -> DomainResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned(self.name))?;
        entries.entry(key).or_default().push(entry);
        Ok(())
    }

    /// Entries for `key`, oldest first.
    pub fn entries(&self, key: &K) -> DomainResult<Vec<V>> {
        let entries = self.entries.read().map_err(|_| poisoned(self.name))?;
        Ok(entries.get(key).cloned().unwrap_or_default())
    }

    pub fn len(&self, key: &K) -> DomainResult<usize> {
        let entries = self.entries.read().map_err(|_| poisoned(self.name))?;
        Ok(entries.get(key).map_or(0, Vec::len))
    }
}
