//! Table DDL: one column clause per field in declaration order. Walking the
//! relationship fields populates the FK and join-table caches as a side
//! effect, for the later passes.

use super::SchemaCaches;
use crate::dialect::SqlDialect;
use crate::error::{DialectError, MetadataError};
use crate::meta::{EntityDescriptor, FieldDescriptor, RelationKind};
use crate::value::ValueType;

/// Result of rendering one field as a column.
#[derive(Debug)]
pub enum ColumnOutcome {
    /// A finished column clause.
    Rendered(String),
    /// The field contributes no column (inverse-side or join-table kinds).
    Omitted,
    /// No dialect mapping for the column's type; the caller logs and moves on.
    Skipped { column: String, reason: DialectError },
}

/// Render one field. Relationship fields of kind one-to-one/many-to-one
/// register `owner` in the FK cache; many-to-many fields register the
/// unordered pair. A target entity without an identifier fails the owner.
pub fn column_clause(
    owner: &'static EntityDescriptor,
    field: &FieldDescriptor,
    dialect: &dyn SqlDialect,
    caches: &SchemaCaches,
) -> Result<ColumnOutcome, MetadataError> {
    if field.is_id {
        return Ok(ColumnOutcome::Rendered(format!(
            "{} {}",
            field.column_name,
            dialect.identity_clause()
        )));
    }
    let Some(relation) = &field.relation else {
        let value_type = field.value_type.unwrap_or(ValueType::Custom("undeclared"));
        let type_name = match dialect.column_type(value_type) {
            Ok(name) => name,
            Err(reason) => {
                return Ok(ColumnOutcome::Skipped {
                    column: field.column_name.clone(),
                    reason,
                })
            }
        };
        let mut clause = format!("{} {}", field.column_name, type_name);
        if !field.nullable {
            clause.push(' ');
            clause.push_str(dialect.not_null_clause());
        }
        if field.unique {
            clause.push(' ');
            clause.push_str(dialect.unique_clause());
        }
        return Ok(ColumnOutcome::Rendered(clause));
    };
    let target = (relation.target)();
    match relation.kind {
        RelationKind::OneToOne | RelationKind::ManyToOne => {
            let target_id = target.id_field()?;
            let value_type = target_id.value_type.unwrap_or(ValueType::Custom("unresolved"));
            let type_name = match dialect.column_type(value_type) {
                Ok(name) => name,
                Err(reason) => {
                    return Ok(ColumnOutcome::Skipped {
                        column: field.column_name.clone(),
                        reason,
                    })
                }
            };
            caches.add_fk_owner(owner);
            let constraint = if relation.kind == RelationKind::OneToOne {
                dialect.unique_clause()
            } else {
                dialect.not_null_clause()
            };
            Ok(ColumnOutcome::Rendered(format!(
                "{} {} {}",
                field.column_name, type_name, constraint
            )))
        }
        RelationKind::ManyToMany => {
            caches.add_join_pair(owner, target);
            Ok(ColumnOutcome::Omitted)
        }
        RelationKind::OneToMany => Ok(ColumnOutcome::Omitted),
    }
}

/// CREATE TABLE statement for one entity, columns in declaration order.
/// Unsupported column types are logged and skipped; a missing identifier
/// (own or a referenced target's) fails the entity.
pub fn create_table(
    descriptor: &'static EntityDescriptor,
    dialect: &dyn SqlDialect,
    caches: &SchemaCaches,
) -> Result<String, MetadataError> {
    descriptor.id_field()?;
    let mut columns: Vec<String> = Vec::new();
    for field in descriptor.fields() {
        match column_clause(descriptor, field, dialect, caches)? {
            ColumnOutcome::Rendered(clause) => columns.push(clause),
            ColumnOutcome::Omitted => {}
            ColumnOutcome::Skipped { column, reason } => {
                tracing::warn!(
                    table = %descriptor.table_name,
                    column = %column,
                    %reason,
                    "column skipped"
                );
            }
        }
    }
    Ok(format!(
        "{} {} (\n\t{}\n);",
        dialect.create_table_clause(),
        descriptor.table_name,
        columns.join(",\n\t")
    ))
}
