//! Rowmap: metadata-driven object-relational mapping over PostgreSQL.

pub mod case;
pub mod config;
pub mod connector;
pub mod dialect;
pub mod error;
pub mod meta;
pub mod repository;
pub mod schema;
pub mod sql;
pub mod value;

pub use config::DatabaseConfig;
pub use connector::{Connector, PgConnector};
pub use dialect::{PostgresDialect, SqlDialect};
pub use error::{DialectError, MetadataError, OrmError};
pub use meta::{
    Entity, EntityDescriptor, EntityDescriptorBuilder, EntityObject, EntitySet, RelationKind,
};
pub use repository::{CrudRepository, Repository, RepositoryRegistry};
pub use schema::{SchemaBuilder, SchemaReport};
pub use value::{IdValue, Row, Value, ValueType};
