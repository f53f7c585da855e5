//! Deferred foreign-key DDL, emitted once per cached FK-owning entity after
//! the table pass has created every referenced table.

use crate::dialect::SqlDialect;
use crate::error::MetadataError;
use crate::meta::{EntityDescriptor, RelationKind};

/// ALTER TABLE statements for every foreign-key column of one owner, in
/// field declaration order. Constraint names are deterministic:
/// `fk_<owning table>_<column>`, lowercased.
pub fn foreign_key_statements(
    descriptor: &EntityDescriptor,
    dialect: &dyn SqlDialect,
) -> Result<Vec<String>, MetadataError> {
    let mut statements = Vec::new();
    for field in descriptor.fields() {
        if !matches!(
            field.kind(),
            Some(RelationKind::OneToOne) | Some(RelationKind::ManyToOne)
        ) {
            continue;
        }
        let Some(target) = field.target_descriptor() else {
            continue;
        };
        let target_id = target.id_field()?;
        let constraint = format!(
            "fk_{}_{}",
            descriptor.table_name.to_lowercase(),
            field.column_name.to_lowercase()
        );
        statements.push(dialect.foreign_key_clause(
            &descriptor.table_name,
            &constraint,
            &field.column_name,
            &target.table_name,
            &target_id.column_name,
        ));
    }
    Ok(statements)
}
