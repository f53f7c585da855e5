//! Build-scoped caches: FK-owning entities and unordered many-to-many pairs.
//!
//! Foreign-key and join-table DDL is only valid once every referenced table
//! exists, so the table pass records what it saw here and the later passes
//! drain the records.

use crate::meta::EntityDescriptor;
use std::sync::{Mutex, PoisonError};

/// Unordered pair of entity types needing a join table. Sides are normalized
/// to ascending table-name order at construction, so (A,B) and (B,A) are the
/// same pair and the derived names are deterministic regardless of which
/// side declared the relationship.
#[derive(Clone, Copy)]
pub struct JoinTablePair {
    pub first: &'static EntityDescriptor,
    pub second: &'static EntityDescriptor,
}

impl JoinTablePair {
    pub fn new(a: &'static EntityDescriptor, b: &'static EntityDescriptor) -> Self {
        if a.table_name <= b.table_name {
            JoinTablePair {
                first: a,
                second: b,
            }
        } else {
            JoinTablePair {
                first: b,
                second: a,
            }
        }
    }

    pub fn table_name(&self) -> String {
        format!("{}_{}", self.first.table_name, self.second.table_name)
    }

    /// Join column for one side: lowercased table name plus `_id`.
    pub fn column_for(descriptor: &EntityDescriptor) -> String {
        format!("{}_id", descriptor.table_name.to_lowercase())
    }

    pub fn same_pair(&self, other: &JoinTablePair) -> bool {
        self.first.same_as(other.first) && self.second.same_as(other.second)
    }
}

/// The two deferred-emission caches populated by the table pass. Scoped to
/// one schema build: create a fresh value (or `clear`) between independent
/// builds, otherwise stale entries leak across builds.
#[derive(Default)]
pub struct SchemaCaches {
    fk_owners: Mutex<Vec<&'static EntityDescriptor>>,
    join_pairs: Mutex<Vec<JoinTablePair>>,
}

impl SchemaCaches {
    pub fn new() -> Self {
        SchemaCaches::default()
    }

    /// Record that `owner` holds at least one foreign-key column. Idempotent.
    pub fn add_fk_owner(&self, owner: &'static EntityDescriptor) {
        let mut owners = self
            .fk_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !owners.iter().any(|d| d.same_as(owner)) {
            owners.push(owner);
        }
    }

    /// Record an unordered many-to-many pair. Deduplicated by pair identity.
    pub fn add_join_pair(&self, a: &'static EntityDescriptor, b: &'static EntityDescriptor) {
        let pair = JoinTablePair::new(a, b);
        let mut pairs = self
            .join_pairs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !pairs.iter().any(|p| p.same_pair(&pair)) {
            pairs.push(pair);
        }
    }

    /// FK owners sorted by table name, for deterministic pass order.
    pub fn fk_owners(&self) -> Vec<&'static EntityDescriptor> {
        let mut owners = self
            .fk_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        owners.sort_by(|a, b| a.table_name.cmp(&b.table_name));
        owners
    }

    /// Join pairs sorted by (first, second) table name.
    pub fn join_pairs(&self) -> Vec<JoinTablePair> {
        let mut pairs = self
            .join_pairs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        pairs.sort_by(|a, b| {
            (a.first.table_name.as_str(), a.second.table_name.as_str())
                .cmp(&(b.first.table_name.as_str(), b.second.table_name.as_str()))
        });
        pairs
    }

    pub fn clear(&self) {
        self.fk_owners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.join_pairs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
