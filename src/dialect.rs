//! SQL dialect: semantic column and constraint concepts to concrete vocabulary.

use crate::error::DialectError;
use crate::value::ValueType;

/// Pure mapping, no state. Implementations supply the vocabulary the schema
/// generators assemble into DDL.
pub trait SqlDialect: Send + Sync {
    fn create_table_clause(&self) -> &'static str;

    /// Column data type for a value type. Unsupported types are an error the
    /// table generator downgrades to a skipped column.
    fn column_type(&self, value_type: ValueType) -> Result<&'static str, DialectError>;

    fn not_null_clause(&self) -> &'static str;

    fn unique_clause(&self) -> &'static str;

    /// Identifier column clause: auto-increment plus primary key.
    fn identity_clause(&self) -> &'static str;

    /// Auto-increment type without the primary-key clause, for join-table columns.
    fn identity_column_type(&self) -> &'static str;

    fn foreign_key_clause(
        &self,
        table: &str,
        constraint: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> String;
}

pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn create_table_clause(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS"
    }

    fn column_type(&self, value_type: ValueType) -> Result<&'static str, DialectError> {
        match value_type {
            ValueType::Text => Ok("varchar(255)"),
            ValueType::Int32 => Ok("integer"),
            ValueType::Int64 => Ok("bigint"),
            ValueType::Bool => Ok("boolean"),
            ValueType::Float => Ok("real"),
            ValueType::Timestamp => Ok("timestamp"),
            ValueType::Uuid => Ok("uuid"),
            ValueType::Custom(_) => Err(DialectError::UnsupportedType { value_type }),
        }
    }

    fn not_null_clause(&self) -> &'static str {
        "NOT NULL"
    }

    fn unique_clause(&self) -> &'static str {
        "UNIQUE"
    }

    fn identity_clause(&self) -> &'static str {
        "bigserial PRIMARY KEY NOT NULL"
    }

    fn identity_column_type(&self) -> &'static str {
        "bigserial"
    }

    fn foreign_key_clause(
        &self,
        table: &str,
        constraint: &str,
        column: &str,
        ref_table: &str,
        ref_column: &str,
    ) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({});",
            table, constraint, column, ref_table, ref_column
        )
    }
}
