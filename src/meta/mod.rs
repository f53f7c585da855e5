//! Entity metadata: descriptors, typed builder, registration set.

mod builder;
mod descriptor;
mod entity;
mod entity_set;

pub use builder::EntityDescriptorBuilder;
pub use descriptor::{DescriptorRef, EntityDescriptor, FieldDescriptor, Relation, RelationKind};
pub use entity::{Entity, EntityObject};
pub use entity_set::EntitySet;
