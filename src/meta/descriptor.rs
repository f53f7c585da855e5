//! Static per-entity metadata: names, field kinds, and erased accessors.

use super::EntityObject;
use crate::error::MetadataError;
use crate::value::{Value, ValueType};
use std::fmt;

/// Relationship kind of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Lazy handle to a target descriptor. A plain fn pointer, so mutually
/// referential entity types can describe each other without initialization
/// cycles; the target descriptor is only materialized when followed.
pub type DescriptorRef = fn() -> &'static EntityDescriptor;

pub struct Relation {
    pub kind: RelationKind,
    pub target: DescriptorRef,
    pub mapped_by: Option<&'static str>,
}

pub(crate) type ScalarGet = Box<dyn Fn(&dyn EntityObject) -> Option<Value> + Send + Sync>;
pub(crate) type ScalarSet = Box<dyn Fn(&mut dyn EntityObject, Option<Value>) + Send + Sync>;
pub(crate) type SingleGetMut = Box<
    dyn for<'a> Fn(&'a mut (dyn EntityObject + 'static)) -> Option<&'a mut (dyn EntityObject + 'static)>
        + Send
        + Sync,
>;
pub(crate) type SingleSet = Box<dyn Fn(&mut dyn EntityObject, Box<dyn EntityObject>) + Send + Sync>;
pub(crate) type ManyIterMut = Box<
    dyn for<'a> Fn(&'a mut (dyn EntityObject + 'static)) -> Vec<&'a mut (dyn EntityObject + 'static)>
        + Send
        + Sync,
>;
pub(crate) type ManySet = Box<dyn Fn(&mut dyn EntityObject, Vec<Box<dyn EntityObject>>) + Send + Sync>;

/// Erased accessors for one field. Scalar fields carry value get/set; single
/// relations carry a borrow plus a replace; collection relations carry an
/// element borrow plus a replace.
pub(crate) enum FieldAccess {
    Scalar { get: ScalarGet, set: ScalarSet },
    Single { get_mut: SingleGetMut, set: SingleSet },
    Many { iter_mut: ManyIterMut, set: ManySet },
}

pub struct FieldDescriptor {
    pub name: &'static str,
    pub column_name: String,
    /// Declared value type for scalar columns; `None` for relationship fields
    /// (their column type, if any, is the target's identifier type).
    pub value_type: Option<ValueType>,
    pub relation: Option<Relation>,
    pub nullable: bool,
    pub unique: bool,
    pub is_id: bool,
    pub(crate) access: FieldAccess,
}

impl FieldDescriptor {
    pub fn is_relationship(&self) -> bool {
        self.relation.is_some()
    }

    pub fn kind(&self) -> Option<RelationKind> {
        self.relation.as_ref().map(|r| r.kind)
    }

    pub fn mapped_by(&self) -> Option<&'static str> {
        self.relation.as_ref().and_then(|r| r.mapped_by)
    }

    pub fn target_descriptor(&self) -> Option<&'static EntityDescriptor> {
        self.relation.as_ref().map(|r| (r.target)())
    }

    /// Column value type: own type for scalars, the target's identifier type
    /// for foreign-key fields, `None` for columnless relationship kinds.
    pub fn column_value_type(&self) -> Option<ValueType> {
        match &self.relation {
            None => self.value_type,
            Some(rel) => match rel.kind {
                RelationKind::OneToOne | RelationKind::ManyToOne => {
                    (rel.target)().id_field().ok().and_then(|f| f.value_type)
                }
                RelationKind::OneToMany | RelationKind::ManyToMany => None,
            },
        }
    }

    pub fn get_scalar(&self, obj: &dyn EntityObject) -> Option<Value> {
        match &self.access {
            FieldAccess::Scalar { get, .. } => get(obj),
            _ => None,
        }
    }

    pub fn set_scalar(&self, obj: &mut dyn EntityObject, value: Option<Value>) {
        if let FieldAccess::Scalar { set, .. } = &self.access {
            set(obj, value);
        }
    }

    /// Borrow the single related entity, if set.
    pub fn single_mut<'a>(&self, obj: &'a mut dyn EntityObject) -> Option<&'a mut dyn EntityObject> {
        match &self.access {
            FieldAccess::Single { get_mut, .. } => get_mut(obj),
            _ => None,
        }
    }

    /// Replace the single related entity. Ignored for non-single fields or a
    /// value of the wrong concrete type.
    pub fn set_single(&self, obj: &mut dyn EntityObject, value: Box<dyn EntityObject>) {
        if let FieldAccess::Single { set, .. } = &self.access {
            set(obj, value);
        }
    }

    /// Borrow every element of the related collection; empty when unset.
    pub fn many_mut<'a>(&self, obj: &'a mut dyn EntityObject) -> Vec<&'a mut dyn EntityObject> {
        match &self.access {
            FieldAccess::Many { iter_mut, .. } => iter_mut(obj),
            _ => Vec::new(),
        }
    }

    /// Replace the related collection.
    pub fn set_many(&self, obj: &mut dyn EntityObject, values: Vec<Box<dyn EntityObject>>) {
        if let FieldAccess::Many { set, .. } = &self.access {
            set(obj, values);
        }
    }
}

/// Immutable description of one entity type. Built once per type through the
/// builder, memoized behind [`Entity::descriptor`].
///
/// [`Entity::descriptor`]: super::Entity::descriptor
pub struct EntityDescriptor {
    pub entity_name: &'static str,
    pub table_name: String,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) new_instance: Box<dyn Fn() -> Box<dyn EntityObject> + Send + Sync>,
}

impl EntityDescriptor {
    /// Fields in declaration order. Order drives column order and positional
    /// parameter binding.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_checked(&self, name: &str) -> Result<&FieldDescriptor, MetadataError> {
        self.field(name).ok_or_else(|| MetadataError::UnknownField {
            entity: self.entity_name,
            field: name.to_string(),
        })
    }

    /// The identifier field. Its absence is the fatal per-type configuration
    /// error; consumers report it and skip the type.
    pub fn id_field(&self) -> Result<&FieldDescriptor, MetadataError> {
        self.fields
            .iter()
            .find(|f| f.is_id)
            .ok_or(MetadataError::MissingIdentifier {
                entity: self.entity_name,
            })
    }

    /// Current identifier value of an instance, if the id field exists and is set.
    pub fn id_value(&self, obj: &dyn EntityObject) -> Option<Value> {
        self.fields
            .iter()
            .find(|f| f.is_id)
            .and_then(|f| f.get_scalar(obj))
    }

    /// Blank instance for hydration.
    pub fn new_instance(&self) -> Box<dyn EntityObject> {
        (self.new_instance)()
    }

    /// The one-to-one field on this type whose target is `other`, if any.
    /// Used to wire and load the inverse side of a bidirectional one-to-one.
    pub fn inverse_one_to_one(&self, other: &'static EntityDescriptor) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| {
            f.kind() == Some(RelationKind::OneToOne)
                && f.target_descriptor()
                    .is_some_and(|t| std::ptr::eq(t, other))
        })
    }

    /// Identity comparison; descriptors are process-wide statics, one per type.
    pub fn same_as(&self, other: &EntityDescriptor) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("entity_name", &self.entity_name)
            .field("table_name", &self.table_name)
            .field(
                "fields",
                &self.fields.iter().map(|x| x.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
