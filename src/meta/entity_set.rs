//! Explicit entity registration, standing in for a namespace scanner.

use super::{Entity, EntityDescriptor};
use crate::error::MetadataError;

/// The set of entity types a schema build or registry operates over.
/// Registration order is preserved; duplicate registration is a no-op.
#[derive(Default)]
pub struct EntitySet {
    descriptors: Vec<&'static EntityDescriptor>,
}

impl EntitySet {
    pub fn new() -> Self {
        EntitySet {
            descriptors: Vec::new(),
        }
    }

    pub fn register<T: Entity>(&mut self) -> &mut Self {
        let descriptor = T::descriptor();
        if !self.contains(descriptor) {
            self.descriptors.push(descriptor);
        }
        self
    }

    pub fn descriptors(&self) -> &[&'static EntityDescriptor] {
        &self.descriptors
    }

    pub fn contains(&self, descriptor: &'static EntityDescriptor) -> bool {
        self.descriptors.iter().any(|d| d.same_as(descriptor))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Structural validation over the whole set: every entity has an
    /// identifier, every relationship target is registered, and every
    /// `mapped_by` resolves to a declared field on its target. First failure
    /// wins; the schema driver re-checks per entity so a bad type can be
    /// skipped instead of failing the set.
    pub fn validate(&self) -> Result<(), MetadataError> {
        for descriptor in &self.descriptors {
            descriptor.id_field()?;
            for field in descriptor.fields() {
                let Some(relation) = &field.relation else {
                    continue;
                };
                let target = (relation.target)();
                if !self.contains(target) {
                    return Err(MetadataError::UnregisteredEntity {
                        entity: descriptor.entity_name,
                        field: field.name,
                        target: target.entity_name,
                    });
                }
                if let Some(mapped_by) = relation.mapped_by {
                    if target.field(mapped_by).is_none() {
                        return Err(MetadataError::MissingInverseField {
                            entity: descriptor.entity_name,
                            field: field.name,
                            mapped_by,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
