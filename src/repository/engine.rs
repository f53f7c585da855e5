//! The persistence engine: a type-erased core walking descriptors, plus the
//! typed repository facade over it.

use super::cascade::CascadeGuard;
use super::Repository;
use crate::connector::Connector;
use crate::error::{MetadataError, OrmError};
use crate::meta::{Entity, EntityDescriptor, EntityObject, FieldDescriptor, RelationKind};
use crate::schema::JoinTablePair;
use crate::sql;
use crate::value::{IdValue, Row, Value};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::marker::PhantomData;
use std::sync::Arc;

/// Engine state for one entity type. Cascades construct further cores for
/// target types on the fly; nothing here is type-parametric, so a save can
/// recurse across entity types.
pub(crate) struct RepositoryCore {
    descriptor: &'static EntityDescriptor,
    connector: Arc<dyn Connector>,
}

impl RepositoryCore {
    pub(crate) fn new(descriptor: &'static EntityDescriptor, connector: Arc<dyn Connector>) -> Self {
        RepositoryCore {
            descriptor,
            connector,
        }
    }

    fn for_target(&self, target: &'static EntityDescriptor) -> RepositoryCore {
        RepositoryCore::new(target, self.connector.clone())
    }

    /// Write the entity's own row (update when its id exists, insert with id
    /// readback otherwise), then cascade into present relationships under the
    /// guard. Boxed because the cascade recurses across entity types.
    pub(crate) fn save_object<'a>(
        &'a self,
        obj: &'a mut dyn EntityObject,
        guard: &'a mut CascadeGuard,
    ) -> BoxFuture<'a, Result<(), OrmError>> {
        Box::pin(async move {
            let id_field = self.descriptor.id_field()?;
            let current_id = id_field.get_scalar(obj);
            let persisted = match &current_id {
                Some(id) => self.exists(id.clone()).await?,
                None => false,
            };
            if persisted {
                if let Some(id) = current_id {
                    if let Some(q) = sql::update_by_id(self.descriptor, obj, id)? {
                        self.connector.execute(&q.sql, &q.params).await?;
                    }
                }
            } else {
                let q = sql::insert(self.descriptor, obj)?;
                let returned = self
                    .connector
                    .fetch_optional(&q.sql, &q.params)
                    .await?
                    .ok_or(OrmError::Db(sqlx::Error::RowNotFound))?;
                if let Some(id) = returned.first_value() {
                    id_field.set_scalar(obj, Some(id.clone()));
                }
            }

            let Some(key) = self
                .descriptor
                .id_value(obj)
                .as_ref()
                .and_then(IdValue::from_value)
            else {
                return Ok(());
            };
            if guard.enter(self.descriptor, &key) {
                let result = self.save_relationships(obj, guard).await;
                guard.exit(self.descriptor, &key);
                result?;
            }
            Ok(())
        })
    }

    async fn save_relationships(
        &self,
        obj: &mut dyn EntityObject,
        guard: &mut CascadeGuard,
    ) -> Result<(), OrmError> {
        for field in self.descriptor.fields() {
            match field.kind() {
                Some(RelationKind::OneToOne) => self.save_one_to_one(obj, field, guard).await?,
                Some(RelationKind::OneToMany) => self.save_one_to_many(obj, field, guard).await?,
                Some(RelationKind::ManyToOne) => self.save_many_to_one(obj, field, guard).await?,
                Some(RelationKind::ManyToMany) => self.save_many_to_many(obj, field, guard).await?,
                None => {}
            }
        }
        Ok(())
    }

    /// Save the target, then wire the inverse side (when the target declares
    /// one) back at this entity and save the target once more, so both
    /// foreign keys end up written even if the caller only set one side.
    async fn save_one_to_one(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
        guard: &mut CascadeGuard,
    ) -> Result<(), OrmError> {
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        let target_core = self.for_target(target_desc);
        match field.single_mut(obj) {
            Some(target) => target_core.save_object(target, guard).await?,
            None => return Ok(()),
        }
        // Snapshot after the target save, so it carries the target's fresh
        // identifier into the inverse write.
        let snapshot = obj.clone_object();
        if let Some(inverse) = target_desc.inverse_one_to_one(self.descriptor) {
            if let Some(target) = field.single_mut(obj) {
                inverse.set_single(target, snapshot);
                target_core.save_object(target, guard).await?;
            }
        }
        Ok(())
    }

    /// Point every element's `mapped_by` field at this entity, then save the
    /// element; that write is what persists the owning foreign key. Without
    /// `mapped_by` the collection is not cascaded.
    async fn save_one_to_many(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
        guard: &mut CascadeGuard,
    ) -> Result<(), OrmError> {
        let Some(mapped_by) = field.mapped_by() else {
            return Ok(());
        };
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        let inverse = target_desc
            .field(mapped_by)
            .ok_or(MetadataError::MissingInverseField {
                entity: self.descriptor.entity_name,
                field: field.name,
                mapped_by,
            })?;
        let snapshot = obj.clone_object();
        let target_core = self.for_target(target_desc);
        for element in field.many_mut(obj) {
            inverse.set_single(element, snapshot.clone_object());
            target_core.save_object(element, guard).await?;
        }
        Ok(())
    }

    async fn save_many_to_one(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
        guard: &mut CascadeGuard,
    ) -> Result<(), OrmError> {
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        if let Some(target) = field.single_mut(obj) {
            self.for_target(target_desc)
                .save_object(target, guard)
                .await?;
        }
        Ok(())
    }

    /// Replace-set sync: clear this entity's join rows, then save each
    /// element and link it. An empty collection therefore clears the
    /// association outright.
    async fn save_many_to_many(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
        guard: &mut CascadeGuard,
    ) -> Result<(), OrmError> {
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        let Some(own_id) = self.descriptor.id_value(obj) else {
            return Ok(());
        };
        let pair = JoinTablePair::new(self.descriptor, target_desc);
        let join_table = pair.table_name();
        let own_column = JoinTablePair::column_for(self.descriptor);
        let target_column = JoinTablePair::column_for(target_desc);

        // A failed clear (join table absent) is logged, not fatal.
        let clear = sql::delete_where(&join_table, &own_column, own_id.clone());
        if let Err(e) = self.connector.execute(&clear.sql, &clear.params).await {
            tracing::warn!(table = %join_table, error = %e, "join rows not cleared");
        }

        let target_core = self.for_target(target_desc);
        for element in field.many_mut(obj) {
            target_core.save_object(element, guard).await?;
            if let Some(element_id) = target_desc.id_value(element) {
                let link = sql::insert_join_row(
                    &join_table,
                    &own_column,
                    own_id.clone(),
                    &target_column,
                    element_id,
                );
                self.connector.execute(&link.sql, &link.params).await?;
            }
        }
        Ok(())
    }

    /// Blank instance with scalar columns applied from the row. Relationship
    /// fields stay untouched.
    fn hydrate(&self, row: &Row) -> Box<dyn EntityObject> {
        let mut obj = self.descriptor.new_instance();
        for field in self.descriptor.fields() {
            if field.is_relationship() {
                continue;
            }
            if let Some(value) = row.value(&field.column_name) {
                field.set_scalar(obj.as_mut(), Some(value.clone()));
            }
        }
        obj
    }

    pub(crate) async fn find_by_id_object(
        &self,
        id: Value,
        guard: &mut CascadeGuard,
    ) -> Result<Option<Box<dyn EntityObject>>, OrmError> {
        let q = sql::select_by_id(self.descriptor, id)?;
        let Some(row) = self.connector.fetch_optional(&q.sql, &q.params).await? else {
            return Ok(None);
        };
        let mut obj = self.hydrate(&row);
        self.load_relationships(obj.as_mut(), &row, guard).await?;
        Ok(Some(obj))
    }

    /// Populate relationship fields one edge deep. Loaded targets get their
    /// scalar columns only; nothing recurses past the first edge.
    async fn load_relationships(
        &self,
        obj: &mut dyn EntityObject,
        row: &Row,
        guard: &mut CascadeGuard,
    ) -> Result<(), OrmError> {
        let Some(key) = self
            .descriptor
            .id_value(obj)
            .as_ref()
            .and_then(IdValue::from_value)
        else {
            return Ok(());
        };
        if !guard.enter(self.descriptor, &key) {
            return Ok(());
        }
        let result = self.load_dispatch(obj, row).await;
        guard.exit(self.descriptor, &key);
        result
    }

    async fn load_dispatch(&self, obj: &mut dyn EntityObject, row: &Row) -> Result<(), OrmError> {
        for field in self.descriptor.fields() {
            match field.kind() {
                Some(RelationKind::OneToOne) => self.load_one_to_one(obj, row, field).await?,
                Some(RelationKind::OneToMany) => self.load_one_to_many(obj, field).await?,
                Some(RelationKind::ManyToOne) => self.load_many_to_one(obj, field).await?,
                Some(RelationKind::ManyToMany) => self.load_many_to_many(obj, field).await?,
                None => {}
            }
        }
        Ok(())
    }

    /// Inverse lookup first: one query on the target's own foreign-key
    /// column. Without an inverse field, or when that query misses, this
    /// side's own column is read from the fetched row instead.
    async fn load_one_to_one(
        &self,
        obj: &mut dyn EntityObject,
        row: &Row,
        field: &FieldDescriptor,
    ) -> Result<(), OrmError> {
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        if let Some(inverse) = target_desc.inverse_one_to_one(self.descriptor) {
            if let Some(own_id) = self.descriptor.id_value(obj) {
                let q = sql::select_where(&target_desc.table_name, &inverse.column_name, own_id);
                if let Some(target_row) = self.connector.fetch_optional(&q.sql, &q.params).await? {
                    let target = self.for_target(target_desc).hydrate(&target_row);
                    field.set_single(obj, target);
                    return Ok(());
                }
            }
        }
        if let Some(fk) = row.value(&field.column_name) {
            let q = sql::select_by_id(target_desc, fk.clone())?;
            if let Some(target_row) = self.connector.fetch_optional(&q.sql, &q.params).await? {
                let target = self.for_target(target_desc).hydrate(&target_row);
                field.set_single(obj, target);
            }
        }
        Ok(())
    }

    /// Every target row whose `mapped_by` column holds this entity's id,
    /// compared as identifiers so integer width does not matter.
    async fn load_one_to_many(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
    ) -> Result<(), OrmError> {
        let Some(mapped_by) = field.mapped_by() else {
            return Ok(());
        };
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        let inverse = target_desc
            .field(mapped_by)
            .ok_or(MetadataError::MissingInverseField {
                entity: self.descriptor.entity_name,
                field: field.name,
                mapped_by,
            })?;
        let Some(own_key) = self
            .descriptor
            .id_value(obj)
            .as_ref()
            .and_then(IdValue::from_value)
        else {
            return Ok(());
        };
        let q = sql::select_all(&target_desc.table_name);
        let rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        let target_core = self.for_target(target_desc);
        let mut elements = Vec::new();
        for target_row in &rows {
            let matches = target_row
                .value(&inverse.column_name)
                .and_then(IdValue::from_value)
                == Some(own_key.clone());
            if matches {
                elements.push(target_core.hydrate(target_row));
            }
        }
        field.set_many(obj, elements);
        Ok(())
    }

    /// Scan target rows and probe membership through the inverse collection:
    /// join-table presence for a many-to-many inverse, an existence query on
    /// this entity's own row for a one-to-many inverse. First match wins.
    async fn load_many_to_one(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
    ) -> Result<(), OrmError> {
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        let Some(own_id) = self.descriptor.id_value(obj) else {
            return Ok(());
        };
        let inverse = target_desc.fields().iter().find(|f| {
            f.target_descriptor()
                .is_some_and(|t| t.same_as(self.descriptor))
                && match f.kind() {
                    Some(RelationKind::OneToMany) => f.mapped_by() == Some(field.name),
                    Some(RelationKind::ManyToMany) => true,
                    _ => false,
                }
        });
        let Some(inverse) = inverse else {
            return Ok(());
        };
        let own_id_column = &self.descriptor.id_field()?.column_name;
        let target_id_column = &target_desc.id_field()?.column_name;
        let q = sql::select_all(&target_desc.table_name);
        let rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        for target_row in &rows {
            let Some(candidate) = target_row.value(target_id_column) else {
                continue;
            };
            let member = match inverse.kind() {
                Some(RelationKind::ManyToMany) => {
                    let pair = JoinTablePair::new(self.descriptor, target_desc);
                    let own_column = JoinTablePair::column_for(self.descriptor);
                    let target_column = JoinTablePair::column_for(target_desc);
                    let probe = sql::exists_where(
                        &pair.table_name(),
                        &[
                            (own_column.as_str(), own_id.clone()),
                            (target_column.as_str(), candidate.clone()),
                        ],
                    );
                    self.connector
                        .fetch_optional(&probe.sql, &probe.params)
                        .await?
                        .is_some()
                }
                Some(RelationKind::OneToMany) => {
                    let probe = sql::exists_where(
                        &self.descriptor.table_name,
                        &[
                            (own_id_column.as_str(), own_id.clone()),
                            (field.column_name.as_str(), candidate.clone()),
                        ],
                    );
                    self.connector
                        .fetch_optional(&probe.sql, &probe.params)
                        .await?
                        .is_some()
                }
                _ => false,
            };
            if member {
                field.set_single(obj, self.for_target(target_desc).hydrate(target_row));
                break;
            }
        }
        Ok(())
    }

    /// Join rows give the target ids; the targets come back in one batch,
    /// without cascading their own relationships.
    async fn load_many_to_many(
        &self,
        obj: &mut dyn EntityObject,
        field: &FieldDescriptor,
    ) -> Result<(), OrmError> {
        let Some(target_desc) = field.target_descriptor() else {
            return Ok(());
        };
        let Some(own_id) = self.descriptor.id_value(obj) else {
            return Ok(());
        };
        let pair = JoinTablePair::new(self.descriptor, target_desc);
        let own_column = JoinTablePair::column_for(self.descriptor);
        let target_column = JoinTablePair::column_for(target_desc);
        let q = sql::select_column_where(&pair.table_name(), &target_column, &own_column, own_id);
        let links = self.connector.fetch_all(&q.sql, &q.params).await?;
        let ids: Vec<Value> = links
            .iter()
            .filter_map(|r| r.first_value().cloned())
            .collect();
        if ids.is_empty() {
            field.set_many(obj, Vec::new());
            return Ok(());
        }
        let target_id_column = &target_desc.id_field()?.column_name;
        let q = sql::select_where_in(&target_desc.table_name, target_id_column, ids);
        let rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        let target_core = self.for_target(target_desc);
        let elements = rows.iter().map(|r| target_core.hydrate(r)).collect();
        field.set_many(obj, elements);
        Ok(())
    }

    async fn hydrate_all(
        &self,
        rows: &[Row],
        guard: &mut CascadeGuard,
    ) -> Result<Vec<Box<dyn EntityObject>>, OrmError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let mut obj = self.hydrate(row);
            self.load_relationships(obj.as_mut(), row, guard).await?;
            out.push(obj);
        }
        Ok(out)
    }

    pub(crate) async fn find_all_objects(
        &self,
        guard: &mut CascadeGuard,
    ) -> Result<Vec<Box<dyn EntityObject>>, OrmError> {
        let q = sql::select_all(&self.descriptor.table_name);
        let rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        self.hydrate_all(&rows, guard).await
    }

    pub(crate) async fn find_where_objects(
        &self,
        column: &str,
        value: Value,
        guard: &mut CascadeGuard,
    ) -> Result<Vec<Box<dyn EntityObject>>, OrmError> {
        let q = sql::select_where(&self.descriptor.table_name, column, value);
        let rows = self.connector.fetch_all(&q.sql, &q.params).await?;
        self.hydrate_all(&rows, guard).await
    }

    pub(crate) async fn exists(&self, id: Value) -> Result<bool, OrmError> {
        let id_column = &self.descriptor.id_field()?.column_name;
        let q = sql::exists_where(&self.descriptor.table_name, &[(id_column.as_str(), id)]);
        Ok(self
            .connector
            .fetch_optional(&q.sql, &q.params)
            .await?
            .is_some())
    }

    pub(crate) async fn count(&self) -> Result<u64, OrmError> {
        let q = sql::count(&self.descriptor.table_name);
        let row = self.connector.fetch_optional(&q.sql, &q.params).await?;
        let n = row
            .as_ref()
            .and_then(|r| r.first_value())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(u64::try_from(n).unwrap_or(0))
    }

    pub(crate) async fn delete_by_id(&self, id: Value) -> Result<(), OrmError> {
        let id_column = &self.descriptor.id_field()?.column_name;
        let q = sql::delete_where(&self.descriptor.table_name, id_column, id);
        self.connector.execute(&q.sql, &q.params).await?;
        Ok(())
    }

    pub(crate) async fn delete_all(&self) -> Result<(), OrmError> {
        let q = sql::delete_all(&self.descriptor.table_name);
        self.connector.execute(&q.sql, &q.params).await?;
        Ok(())
    }
}

/// The generic engine for one entity type. The registry constructs these on
/// demand; specialized repositories usually wrap one.
pub struct CrudRepository<T: Entity> {
    core: RepositoryCore,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> CrudRepository<T> {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        CrudRepository {
            core: RepositoryCore::new(T::descriptor(), connector),
            _marker: PhantomData,
        }
    }

    /// Entities whose `field_name` column equals `value`, relationships
    /// loaded. The name must be a declared field of the entity.
    pub async fn find_by_field(&self, field_name: &str, value: Value) -> Result<Vec<T>, OrmError> {
        let field = T::descriptor().field_checked(field_name)?;
        let mut guard = CascadeGuard::new();
        let objects = self
            .core
            .find_where_objects(&field.column_name, value, &mut guard)
            .await?;
        Ok(downcast_all(objects))
    }
}

fn downcast_all<T: Entity>(objects: Vec<Box<dyn EntityObject>>) -> Vec<T> {
    objects
        .into_iter()
        .filter_map(|o| o.into_any().downcast::<T>().ok().map(|b| *b))
        .collect()
}

#[async_trait]
impl<T: Entity> Repository<T> for CrudRepository<T> {
    async fn save(&self, mut entity: T) -> Result<T, OrmError> {
        let mut guard = CascadeGuard::new();
        self.core.save_object(&mut entity, &mut guard).await?;
        Ok(entity)
    }

    async fn save_all(&self, entities: Vec<T>) -> Result<Vec<T>, OrmError> {
        let mut out = Vec::with_capacity(entities.len());
        for entity in entities {
            out.push(self.save(entity).await?);
        }
        Ok(out)
    }

    async fn find_by_id(&self, id: T::Id) -> Result<Option<T>, OrmError> {
        let mut guard = CascadeGuard::new();
        let found = self.core.find_by_id_object(id.into(), &mut guard).await?;
        Ok(found.and_then(|o| o.into_any().downcast::<T>().ok().map(|b| *b)))
    }

    async fn find_all(&self) -> Result<Vec<T>, OrmError> {
        let mut guard = CascadeGuard::new();
        let objects = self.core.find_all_objects(&mut guard).await?;
        Ok(downcast_all(objects))
    }

    async fn find_all_by_id(&self, ids: Vec<T::Id>) -> Result<Vec<T>, OrmError> {
        let mut out = Vec::new();
        for id in ids {
            if let Some(entity) = self.find_by_id(id).await? {
                out.push(entity);
            }
        }
        Ok(out)
    }

    async fn exists_by_id(&self, id: T::Id) -> Result<bool, OrmError> {
        self.core.exists(id.into()).await
    }

    async fn count(&self) -> Result<u64, OrmError> {
        self.core.count().await
    }

    async fn delete_by_id(&self, id: T::Id) -> Result<(), OrmError> {
        self.core.delete_by_id(id.into()).await
    }

    async fn delete(&self, entity: T) -> Result<(), OrmError> {
        match T::descriptor().id_value(&entity) {
            Some(id) => self.core.delete_by_id(id).await,
            None => Ok(()),
        }
    }

    async fn delete_all_by_id(&self, ids: Vec<T::Id>) -> Result<(), OrmError> {
        for id in ids {
            self.core.delete_by_id(id.into()).await?;
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), OrmError> {
        self.core.delete_all().await
    }
}
