//! Typed errors for metadata, dialect, and persistence operations.

use crate::value::ValueType;
use thiserror::Error;

/// Structural problems in entity declarations. Scoped to one entity type;
/// callers skip the offending type rather than abort a whole pass.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("entity '{entity}' has no identifier field")]
    MissingIdentifier { entity: &'static str },
    #[error("field '{entity}.{field}' targets '{target}', which is not a registered entity")]
    UnregisteredEntity {
        entity: &'static str,
        field: &'static str,
        target: &'static str,
    },
    #[error("mapped_by '{mapped_by}' on '{entity}.{field}' names no field of the target entity")]
    MissingInverseField {
        entity: &'static str,
        field: &'static str,
        mapped_by: &'static str,
    },
    #[error("entity '{entity}' has no field named '{field}'")]
    UnknownField { entity: &'static str, field: String },
}

#[derive(Error, Debug)]
pub enum DialectError {
    #[error("no column type mapping for {value_type}")]
    UnsupportedType { value_type: ValueType },
}

#[derive(Error, Debug)]
pub enum OrmError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Dialect(#[from] DialectError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("unsupported statement: {0}")]
    Unsupported(String),
}
