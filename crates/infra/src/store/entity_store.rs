use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use destore_core::{DomainError, DomainResult, Entity};

use super::poisoned;

/// Per-service entity storage keyed by the entity's unique key.
///
/// Read-modify-write sequences must run under the caller's [`KeyedLocks`]
/// guard for the same key; the store itself only guarantees that each call
/// is atomic.
///
/// [`KeyedLocks`]: super::KeyedLocks
pub trait EntityStore<E: Entity>: Send + Sync {
    fn get(&self, id: &E::Id) -> DomainResult<Option<E>>;

    fn list(&self) -> DomainResult<Vec<E>>;

    /// Insert a new entity; fails with a validation error if the key is taken.
    fn insert(&self, entity: E) -> DomainResult<()>;

    /// Insert or replace.
    fn save(&self, entity: E) -> DomainResult<()>;

    fn remove(&self, id: &E::Id) -> DomainResult<Option<E>>;

    /// Entities matching `pred`.
    fn filter(&self, pred: &dyn Fn(&E) -> bool) -> DomainResult<Vec<E>> {
        Ok(self.list()?.into_iter().filter(|e| pred(e)).collect())
    }

    /// First entity matching `pred` (secondary unique keys).
    fn find(&self, pred: &dyn Fn(&E) -> bool) -> DomainResult<Option<E>> {
        Ok(self.list()?.into_iter().find(|e| pred(e)))
    }
}

impl<E, S> EntityStore<E> for Arc<S>
where
    E: Entity,
    S: EntityStore<E> + ?Sized,
{
    fn get(&self, id: &E::Id) -> DomainResult<Option<E>> {
        (**self).get(id)
    }

    fn list(&self) -> DomainResult<Vec<E>> {
        (**self).list()
    }

    fn insert(&self, entity: E) -> DomainResult<()> {
        (**self).insert(entity)
    }

    fn save(&self, entity: E) -> DomainResult<()> {
        (**self).save(entity)
    }

    fn remove(&self, id: &E::Id) -> DomainResult<Option<E>> {
        (**self).remove(id)
    }
}

/// In-memory entity store for tests/dev and the single-process runtime.
#[derive(Debug)]
pub struct InMemoryEntityStore<E: Entity> {
    name: &'static str,
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> InMemoryEntityStore<E> {
    /// `name` is the entity name used in error messages.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> EntityStore<E> for InMemoryEntityStore<E>
where
    E: Entity + Clone + Send + Sync + 'static,
    E::Id: Send + Sync + 'static,
{
    fn get(&self, id: &E::Id) -> DomainResult<Option<E>> {
        let map = self.inner.read().map_err(|_| poisoned(self.name))?;
        Ok(map.get(id).cloned())
    }

    fn list(&self) -> DomainResult<Vec<E>> {
        let map = self.inner.read().map_err(|_| poisoned(self.name))?;
        Ok(map.values().cloned().collect())
    }

    fn insert(&self, entity: E) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned(self.name))?;
        let id = entity.id();
        if map.contains_key(&id) {
            return Err(DomainError::validation(format!(
                "{} already exists with {:?}",
                self.name, id
            )));
        }
        map.insert(id, entity);
        Ok(())
    }

    fn save(&self, entity: E) -> DomainResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned(self.name))?;
        map.insert(entity.id(), entity);
        Ok(())
    }

    fn remove(&self, id: &E::Id) -> DomainResult<Option<E>> {
        let mut map = self.inner.write().map_err(|_| poisoned(self.name))?;
        Ok(map.remove(id))
    }
}
