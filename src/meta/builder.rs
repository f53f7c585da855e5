//! Typed descriptor builder. Field accessors are supplied as closures over
//! the concrete entity type and erased behind the object surface here.

use super::descriptor::{
    FieldAccess, ManyIterMut, ManySet, ScalarGet, ScalarSet, SingleGetMut, SingleSet,
};
use super::{Entity, EntityDescriptor, EntityObject, FieldDescriptor, Relation, RelationKind};
use crate::case::{derive_column_name, derive_table_name};
use crate::value::{Value, ValueType};
use std::marker::PhantomData;

impl EntityDescriptor {
    /// Start a descriptor for `T`. `simple_name` is the bare type name the
    /// table name derives from.
    pub fn builder<T: Entity>(simple_name: &'static str) -> EntityDescriptorBuilder<T> {
        EntityDescriptorBuilder {
            simple_name,
            table_name: None,
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }
}

pub struct EntityDescriptorBuilder<T: Entity> {
    simple_name: &'static str,
    table_name: Option<String>,
    fields: Vec<FieldDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityDescriptorBuilder<T> {
    /// Explicit table name override; empty falls back to the derived name.
    pub fn table_name(mut self, name: &str) -> Self {
        self.table_name = Some(name.to_string());
        self
    }

    /// The identifier field. Exactly one per entity; consumers surface the
    /// missing-identifier error when absent.
    pub fn id(
        self,
        name: &'static str,
        value_type: ValueType,
        get: impl Fn(&T) -> Option<Value> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<Value>) + Send + Sync + 'static,
    ) -> Self {
        self.push_scalar(name, value_type, get, set, true)
    }

    /// Plain column field. NOT NULL by default; chain [`Self::nullable`] /
    /// [`Self::unique`] / [`Self::column_name`] to adjust the last field added.
    pub fn column(
        self,
        name: &'static str,
        value_type: ValueType,
        get: impl Fn(&T) -> Option<Value> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<Value>) + Send + Sync + 'static,
    ) -> Self {
        self.push_scalar(name, value_type, get, set, false)
    }

    /// One-to-one relationship. Owns a UNIQUE foreign-key column; the inverse
    /// side, when declared on the target, is found by scanning its fields.
    pub fn one_to_one<U: Entity>(
        self,
        name: &'static str,
        get_mut: impl for<'a> Fn(&'a mut T) -> Option<&'a mut U> + Send + Sync + 'static,
        set: impl Fn(&mut T, U) + Send + Sync + 'static,
    ) -> Self {
        self.push_single::<U>(name, RelationKind::OneToOne, None, get_mut, set)
    }

    /// Many-to-one relationship. Owns a NOT NULL foreign-key column;
    /// `mapped_by` optionally names the inverse collection on the target.
    pub fn many_to_one<U: Entity>(
        self,
        name: &'static str,
        mapped_by: Option<&'static str>,
        get_mut: impl for<'a> Fn(&'a mut T) -> Option<&'a mut U> + Send + Sync + 'static,
        set: impl Fn(&mut T, U) + Send + Sync + 'static,
    ) -> Self {
        self.push_single::<U>(name, RelationKind::ManyToOne, mapped_by, get_mut, set)
    }

    /// One-to-many relationship (inverse side, no column). `mapped_by` names
    /// the owning field on the target; without it, saves skip the collection
    /// entirely and loads leave it empty.
    pub fn one_to_many<U: Entity>(
        self,
        name: &'static str,
        mapped_by: Option<&'static str>,
        iter_mut: impl for<'a> Fn(&'a mut T) -> Vec<&'a mut U> + Send + Sync + 'static,
        set: impl Fn(&mut T, Vec<U>) + Send + Sync + 'static,
    ) -> Self {
        self.push_many::<U>(name, RelationKind::OneToMany, mapped_by, iter_mut, set)
    }

    /// Many-to-many relationship; materializes as a join table named from the
    /// sorted table-name pair, never as a column.
    pub fn many_to_many<U: Entity>(
        self,
        name: &'static str,
        iter_mut: impl for<'a> Fn(&'a mut T) -> Vec<&'a mut U> + Send + Sync + 'static,
        set: impl Fn(&mut T, Vec<U>) + Send + Sync + 'static,
    ) -> Self {
        self.push_many::<U>(name, RelationKind::ManyToMany, None, iter_mut, set)
    }

    /// Mark the last added field nullable.
    pub fn nullable(mut self) -> Self {
        if let Some(f) = self.fields.last_mut() {
            f.nullable = true;
        }
        self
    }

    /// Mark the last added field unique.
    pub fn unique(mut self) -> Self {
        if let Some(f) = self.fields.last_mut() {
            f.unique = true;
        }
        self
    }

    /// Explicit column name for the last added field.
    pub fn column_name(mut self, name: &str) -> Self {
        if let Some(f) = self.fields.last_mut() {
            f.column_name = derive_column_name(f.name, Some(name));
        }
        self
    }

    pub fn build(self) -> EntityDescriptor {
        EntityDescriptor {
            entity_name: self.simple_name,
            table_name: derive_table_name(self.simple_name, self.table_name.as_deref()),
            fields: self.fields,
            new_instance: Box::new(|| Box::new(T::default()) as Box<dyn EntityObject>),
        }
    }

    fn push_scalar(
        mut self,
        name: &'static str,
        value_type: ValueType,
        get: impl Fn(&T) -> Option<Value> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<Value>) + Send + Sync + 'static,
        is_id: bool,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            column_name: derive_column_name(name, None),
            value_type: Some(value_type),
            relation: None,
            nullable: false,
            unique: false,
            is_id,
            access: FieldAccess::Scalar {
                get: scalar_get::<T>(get),
                set: scalar_set::<T>(set),
            },
        });
        self
    }

    fn push_single<U: Entity>(
        mut self,
        name: &'static str,
        kind: RelationKind,
        mapped_by: Option<&'static str>,
        get_mut: impl for<'a> Fn(&'a mut T) -> Option<&'a mut U> + Send + Sync + 'static,
        set: impl Fn(&mut T, U) + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            column_name: derive_column_name(name, None),
            value_type: None,
            relation: Some(Relation {
                kind,
                target: U::descriptor,
                mapped_by,
            }),
            nullable: false,
            unique: false,
            is_id: false,
            access: FieldAccess::Single {
                get_mut: single_get_mut::<T, U>(get_mut),
                set: single_set::<T, U>(set),
            },
        });
        self
    }

    fn push_many<U: Entity>(
        mut self,
        name: &'static str,
        kind: RelationKind,
        mapped_by: Option<&'static str>,
        iter_mut: impl for<'a> Fn(&'a mut T) -> Vec<&'a mut U> + Send + Sync + 'static,
        set: impl Fn(&mut T, Vec<U>) + Send + Sync + 'static,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            column_name: derive_column_name(name, None),
            value_type: None,
            relation: Some(Relation {
                kind,
                target: U::descriptor,
                mapped_by,
            }),
            nullable: false,
            unique: false,
            is_id: false,
            access: FieldAccess::Many {
                iter_mut: many_iter_mut::<T, U>(iter_mut),
                set: many_set::<T, U>(set),
            },
        });
        self
    }
}

fn scalar_get<T: Entity>(get: impl Fn(&T) -> Option<Value> + Send + Sync + 'static) -> ScalarGet {
    Box::new(move |obj| obj.as_any().downcast_ref::<T>().and_then(|e| get(e)))
}

fn scalar_set<T: Entity>(set: impl Fn(&mut T, Option<Value>) + Send + Sync + 'static) -> ScalarSet {
    Box::new(move |obj, v| {
        if let Some(e) = obj.as_any_mut().downcast_mut::<T>() {
            set(e, v);
        }
    })
}

fn single_get_mut<T: Entity, U: Entity>(
    get: impl for<'a> Fn(&'a mut T) -> Option<&'a mut U> + Send + Sync + 'static,
) -> SingleGetMut {
    Box::new(move |obj| {
        obj.as_any_mut()
            .downcast_mut::<T>()
            .and_then(|e| get(e).map(|u| u as &mut dyn EntityObject))
    })
}

fn single_set<T: Entity, U: Entity>(set: impl Fn(&mut T, U) + Send + Sync + 'static) -> SingleSet {
    Box::new(move |obj, value| {
        let Some(e) = obj.as_any_mut().downcast_mut::<T>() else {
            return;
        };
        if let Ok(u) = value.into_any().downcast::<U>() {
            set(e, *u);
        }
    })
}

fn many_iter_mut<T: Entity, U: Entity>(
    iter: impl for<'a> Fn(&'a mut T) -> Vec<&'a mut U> + Send + Sync + 'static,
) -> ManyIterMut {
    Box::new(move |obj| match obj.as_any_mut().downcast_mut::<T>() {
        Some(e) => iter(e)
            .into_iter()
            .map(|u| u as &mut dyn EntityObject)
            .collect(),
        None => Vec::new(),
    })
}

fn many_set<T: Entity, U: Entity>(set: impl Fn(&mut T, Vec<U>) + Send + Sync + 'static) -> ManySet {
    Box::new(move |obj, values| {
        let Some(e) = obj.as_any_mut().downcast_mut::<T>() else {
            return;
        };
        let typed: Vec<U> = values
            .into_iter()
            .filter_map(|b| b.into_any().downcast::<U>().ok().map(|u| *u))
            .collect();
        set(e, typed);
    })
}
