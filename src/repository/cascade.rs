//! Re-entrancy guard for cascading saves and loads. One guard per top-level
//! repository call; never shared across calls, so one call's in-flight
//! cascade cannot mask another's.

use crate::meta::EntityDescriptor;
use crate::value::IdValue;

#[derive(PartialEq)]
struct GuardKey {
    /// Descriptor address stands in for the entity type; descriptors are
    /// process-wide statics, one per type.
    descriptor: usize,
    id: IdValue,
}

fn key(descriptor: &'static EntityDescriptor, id: &IdValue) -> GuardKey {
    GuardKey {
        descriptor: descriptor as *const EntityDescriptor as usize,
        id: id.clone(),
    }
}

/// Entities whose relationship dispatch is currently on the call stack,
/// keyed by (type, identifier). A failed `enter` means the cascade step is
/// a no-op for that entity; the row write itself still happens.
#[derive(Default)]
pub(crate) struct CascadeGuard {
    active: Vec<GuardKey>,
}

impl CascadeGuard {
    pub fn new() -> Self {
        CascadeGuard::default()
    }

    /// Mark an entity as in progress. `false` when it already is; the caller
    /// must then skip the dispatch and must not call [`Self::exit`].
    pub fn enter(&mut self, descriptor: &'static EntityDescriptor, id: &IdValue) -> bool {
        let k = key(descriptor, id);
        if self.active.contains(&k) {
            return false;
        }
        self.active.push(k);
        true
    }

    /// Clear an entity on the way out, on success and on failure alike.
    pub fn exit(&mut self, descriptor: &'static EntityDescriptor, id: &IdValue) {
        let k = key(descriptor, id);
        if let Some(pos) = self.active.iter().position(|a| *a == k) {
            self.active.remove(pos);
        }
    }
}
