//! Entity-type to repository resolution with memoized construction.

use super::{CrudRepository, Repository};
use crate::connector::Connector;
use crate::meta::Entity;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Held = Box<dyn Any + Send + Sync>;

/// One repository per entity type, created on first request. Explicitly
/// registered instances win over the generic engine; registration is
/// first-wins, so resolving a type pins whatever the registry held at that
/// moment.
pub struct RepositoryRegistry {
    connector: Arc<dyn Connector>,
    repositories: RwLock<HashMap<TypeId, Held>>,
    contracts: RwLock<HashMap<TypeId, Held>>,
}

impl RepositoryRegistry {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        RepositoryRegistry {
            connector,
            repositories: RwLock::new(HashMap::new()),
            contracts: RwLock::new(HashMap::new()),
        }
    }

    /// The repository for `T`: the registered instance if any, otherwise a
    /// memoized generic engine.
    pub fn repository<T: Entity>(&self) -> Arc<dyn Repository<T>> {
        if let Some(existing) = self.lookup::<T>() {
            return existing;
        }
        let mut map = self
            .repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = held_repository::<T>(map.get(&TypeId::of::<T>())) {
            return existing;
        }
        let repo: Arc<dyn Repository<T>> =
            Arc::new(CrudRepository::<T>::new(self.connector.clone()));
        map.insert(TypeId::of::<T>(), Box::new(repo.clone()));
        repo
    }

    /// Substitute a specialized repository for `T`. Returns the instance the
    /// registry holds afterwards: the given one, or the earlier one when `T`
    /// was already resolved or registered.
    pub fn register<T: Entity>(
        &self,
        repository: Arc<dyn Repository<T>>,
    ) -> Arc<dyn Repository<T>> {
        let mut map = self
            .repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = held_repository::<T>(map.get(&TypeId::of::<T>())) {
            return existing;
        }
        map.insert(TypeId::of::<T>(), Box::new(repository.clone()));
        repository
    }

    fn lookup<T: Entity>(&self) -> Option<Arc<dyn Repository<T>>> {
        let map = self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        held_repository::<T>(map.get(&TypeId::of::<T>()))
    }

    /// File an implementation under a named contract, usually a trait object
    /// type. First registration wins here too.
    pub fn register_contract<C>(&self, implementation: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mut map = self
            .contracts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(TypeId::of::<C>())
            .or_insert_with(|| Box::new(implementation));
    }

    pub fn contract<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let map = self
            .contracts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        map.get(&TypeId::of::<C>())
            .and_then(|held| held.downcast_ref::<Arc<C>>())
            .cloned()
    }
}

fn held_repository<T: Entity>(held: Option<&Held>) -> Option<Arc<dyn Repository<T>>> {
    held.and_then(|h| h.downcast_ref::<Arc<dyn Repository<T>>>())
        .cloned()
}
