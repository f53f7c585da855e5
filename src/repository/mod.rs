//! Relationship-aware repositories: the CRUD contract, the generic engine
//! behind it, and the registry memoizing one repository per entity type.

mod cascade;
mod engine;
mod registry;

pub use engine::CrudRepository;
pub use registry::RepositoryRegistry;

use crate::error::OrmError;
use crate::meta::Entity;
use async_trait::async_trait;

/// The CRUD contract repositories satisfy. `save` and the finders walk
/// declared relationships; the delete operations touch only the entity's own
/// rows, never related ones.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Insert or update depending on whether the entity's id already exists,
    /// then cascade into present relationships. Returns the entity with any
    /// generated identifier filled in.
    async fn save(&self, entity: T) -> Result<T, OrmError>;

    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>, OrmError>;

    /// The row with this identifier, relationships loaded one edge deep.
    async fn find_by_id(&self, id: T::Id) -> Result<Option<T>, OrmError>;

    async fn find_all(&self) -> Result<Vec<T>, OrmError>;

    /// Per-id lookups; absent ids are skipped rather than reported.
    async fn find_all_by_id(&self, ids: Vec<T::Id>) -> Result<Vec<T>, OrmError>;

    async fn exists_by_id(&self, id: T::Id) -> Result<bool, OrmError>;

    async fn count(&self) -> Result<u64, OrmError>;

    async fn delete_by_id(&self, id: T::Id) -> Result<(), OrmError>;

    /// Delete by the entity's current id; an entity without one is a no-op.
    async fn delete(&self, entity: T) -> Result<(), OrmError>;

    async fn delete_all_by_id(&self, ids: Vec<T::Id>) -> Result<(), OrmError>;

    async fn delete_all(&self) -> Result<(), OrmError>;
}
