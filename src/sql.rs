//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from entity metadata.
//!
//! Statement text and parameter list are always produced together, so the
//! `$n` placeholders cannot drift from the bound values.

use crate::error::MetadataError;
use crate::meta::{EntityDescriptor, EntityObject, FieldDescriptor, RelationKind};
use crate::value::Value;

pub struct StatementBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl StatementBuf {
    fn new() -> Self {
        StatementBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Value a field binds into its column, if any. Scalars bind their value,
/// single relations bind the related entity's identifier, collection
/// relations and absent values bind nothing (the column is left out).
fn bound_value(field: &FieldDescriptor, obj: &mut dyn EntityObject) -> Option<Value> {
    match field.kind() {
        None => field.get_scalar(obj),
        Some(RelationKind::OneToOne) | Some(RelationKind::ManyToOne) => {
            let target = field.target_descriptor()?;
            let related = field.single_mut(obj)?;
            target.id_value(related)
        }
        Some(RelationKind::OneToMany) | Some(RelationKind::ManyToMany) => None,
    }
}

/// INSERT for one instance, skipping the identifier and every absent value;
/// returns the generated identifier. No bindable column at all degenerates
/// to DEFAULT VALUES.
pub fn insert(
    descriptor: &EntityDescriptor,
    obj: &mut dyn EntityObject,
) -> Result<StatementBuf, MetadataError> {
    let id = descriptor.id_field()?;
    let mut q = StatementBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for field in descriptor.fields() {
        if field.is_id {
            continue;
        }
        let Some(value) = bound_value(field, obj) else {
            continue;
        };
        let n = q.push_param(value);
        cols.push(field.column_name.clone());
        placeholders.push(format!("${}", n));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            descriptor.table_name, id.column_name
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            descriptor.table_name,
            cols.join(", "),
            placeholders.join(", "),
            id.column_name
        )
    };
    Ok(q)
}

/// UPDATE by identifier, SET only the bindable columns (same skip rules as
/// [`insert`]). `None` when nothing binds; the caller skips the statement.
pub fn update_by_id(
    descriptor: &EntityDescriptor,
    obj: &mut dyn EntityObject,
    id: Value,
) -> Result<Option<StatementBuf>, MetadataError> {
    let id_field = descriptor.id_field()?;
    let mut q = StatementBuf::new();
    let mut sets = Vec::new();
    for field in descriptor.fields() {
        if field.is_id {
            continue;
        }
        let Some(value) = bound_value(field, obj) else {
            continue;
        };
        let n = q.push_param(value);
        sets.push(format!("{} = ${}", field.column_name, n));
    }
    if sets.is_empty() {
        return Ok(None);
    }
    let id_param = q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        descriptor.table_name,
        sets.join(", "),
        id_field.column_name,
        id_param
    );
    Ok(Some(q))
}

/// SELECT one row by identifier.
pub fn select_by_id(descriptor: &EntityDescriptor, id: Value) -> Result<StatementBuf, MetadataError> {
    let id_field = descriptor.id_field()?;
    Ok(select_where(
        &descriptor.table_name,
        &id_field.column_name,
        id,
    ))
}

/// SELECT every row of a table.
pub fn select_all(table: &str) -> StatementBuf {
    StatementBuf {
        sql: format!("SELECT * FROM {}", table),
        params: Vec::new(),
    }
}

/// SELECT rows matching one column.
pub fn select_where(table: &str, column: &str, value: Value) -> StatementBuf {
    let mut q = StatementBuf::new();
    let n = q.push_param(value);
    q.sql = format!("SELECT * FROM {} WHERE {} = ${}", table, column, n);
    q
}

/// SELECT rows whose column is IN the given values. Empty values produce a
/// statement matching nothing.
pub fn select_where_in(table: &str, column: &str, values: Vec<Value>) -> StatementBuf {
    let mut q = StatementBuf::new();
    if values.is_empty() {
        q.sql = format!("SELECT * FROM {} WHERE 1 = 0", table);
        return q;
    }
    let placeholders: Vec<String> = values
        .into_iter()
        .map(|v| format!("${}", q.push_param(v)))
        .collect();
    q.sql = format!(
        "SELECT * FROM {} WHERE {} IN ({})",
        table,
        column,
        placeholders.join(", ")
    );
    q
}

/// Single-column projection filtered on another column. Used to read one
/// side of a join table.
pub fn select_column_where(
    table: &str,
    column: &str,
    where_column: &str,
    value: Value,
) -> StatementBuf {
    let mut q = StatementBuf::new();
    let n = q.push_param(value);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        column, table, where_column, n
    );
    q
}

/// Existence probe: `SELECT 1` under the conjunction of the conditions.
/// Conditions must be non-empty.
pub fn exists_where(table: &str, conditions: &[(&str, Value)]) -> StatementBuf {
    let mut q = StatementBuf::new();
    let parts: Vec<String> = conditions
        .iter()
        .map(|(col, v)| format!("{} = ${}", col, q.push_param(v.clone())))
        .collect();
    q.sql = format!("SELECT 1 FROM {} WHERE {}", table, parts.join(" AND "));
    q
}

pub fn count(table: &str) -> StatementBuf {
    StatementBuf {
        sql: format!("SELECT COUNT(*) FROM {}", table),
        params: Vec::new(),
    }
}

/// DELETE rows matching one column.
pub fn delete_where(table: &str, column: &str, value: Value) -> StatementBuf {
    let mut q = StatementBuf::new();
    let n = q.push_param(value);
    q.sql = format!("DELETE FROM {} WHERE {} = ${}", table, column, n);
    q
}

pub fn delete_all(table: &str) -> StatementBuf {
    StatementBuf {
        sql: format!("DELETE FROM {}", table),
        params: Vec::new(),
    }
}

/// INSERT one join-table row linking two identifiers.
pub fn insert_join_row(
    table: &str,
    own_column: &str,
    own_id: Value,
    target_column: &str,
    target_id: Value,
) -> StatementBuf {
    let mut q = StatementBuf::new();
    let a = q.push_param(own_id);
    let b = q.push_param(target_id);
    q.sql = format!(
        "INSERT INTO {} ({}, {}) VALUES (${}, ${})",
        table, own_column, target_column, a, b
    );
    q
}
