//! Entity traits: the typed marker plus the type-erased instance surface.

use super::EntityDescriptor;
use crate::value::Value;
use std::any::Any;

/// A persistable type. Implementations expose a process-wide descriptor
/// built once via [`EntityDescriptor::builder`]; `Default` supplies the
/// blank instance hydration starts from.
///
/// [`EntityDescriptor::builder`]: super::EntityDescriptor::builder
pub trait Entity: Clone + Default + Send + Sync + 'static {
    /// Identifier value type: the payload of the id field, not the `Option`
    /// around it.
    type Id: Into<Value> + Clone + Send + Sync + 'static;

    fn descriptor() -> &'static EntityDescriptor;
}

/// Type-erased instance surface the persistence engine works through.
pub trait EntityObject: Any + Send {
    fn descriptor(&self) -> &'static EntityDescriptor;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_object(&self) -> Box<dyn EntityObject>;
}

impl<T: Entity> EntityObject for T {
    fn descriptor(&self) -> &'static EntityDescriptor {
        T::descriptor()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_object(&self) -> Box<dyn EntityObject> {
        Box::new(self.clone())
    }
}
