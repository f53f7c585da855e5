//! Join-table DDL for many-to-many pairs: one create plus two constraints,
//! all named from the sorted table-name pair.

use super::JoinTablePair;
use crate::dialect::SqlDialect;
use crate::error::MetadataError;

/// The three statements realizing one many-to-many pair: create the join
/// table, then link each column back to its owning table's identifier.
pub fn join_table_statements(
    pair: &JoinTablePair,
    dialect: &dyn SqlDialect,
) -> Result<Vec<String>, MetadataError> {
    let table = pair.table_name();
    let first_column = JoinTablePair::column_for(pair.first);
    let second_column = JoinTablePair::column_for(pair.second);
    let first_id = pair.first.id_field()?;
    let second_id = pair.second.id_field()?;

    let create = format!(
        "{} {} (\n{} {} {},\n{} {} {}\n);",
        dialect.create_table_clause(),
        table,
        first_column,
        dialect.identity_column_type(),
        dialect.not_null_clause(),
        second_column,
        dialect.identity_column_type(),
        dialect.not_null_clause(),
    );

    Ok(vec![
        create,
        dialect.foreign_key_clause(
            &table,
            &format!(
                "fk_{}_{}",
                table.to_lowercase(),
                pair.first.table_name.to_lowercase()
            ),
            &first_column,
            &pair.first.table_name,
            &first_id.column_name,
        ),
        dialect.foreign_key_clause(
            &table,
            &format!(
                "fk_{}_{}",
                table.to_lowercase(),
                pair.second.table_name.to_lowercase()
            ),
            &second_column,
            &pair.second.table_name,
            &second_id.column_name,
        ),
    ])
}
