//! Schema derivation: DDL generators, build caches, and the three-pass driver.

mod builder;
mod caches;
mod foreign_key;
mod join_table;
mod table;

pub use builder::{SchemaBuilder, SchemaReport};
pub use caches::{JoinTablePair, SchemaCaches};
pub use foreign_key::foreign_key_statements;
pub use join_table::join_table_statements;
pub use table::{column_clause, create_table, ColumnOutcome};

#[cfg(test)]
pub(crate) mod test_entities;
