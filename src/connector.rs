//! Database connectors: the async statement surface the engine and schema
//! builder run against, plus the shipped Postgres implementation.

use crate::config::DatabaseConfig;
use crate::error::OrmError;
use crate::value::{Row, Value};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row as _, TypeInfo};

/// Async statement execution against one database. Parameters are positional
/// and match `$n` placeholders in the statement text.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Run a statement without reading rows back; returns the affected count.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, OrmError>;

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, OrmError>;

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, OrmError>;

    /// Release the underlying connections. Further calls error.
    async fn close(&self);
}

/// [`Connector`] over a sqlx Postgres pool.
pub struct PgConnector {
    pool: PgPool,
}

impl PgConnector {
    /// Open a pool against `config.url`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, OrmError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;
        Ok(PgConnector { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        PgConnector { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, OrmError> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        let done = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, OrmError> {
        tracing::debug!(sql = %sql, params = ?params, "fetch_all");
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, OrmError> {
        tracing::debug!(sql = %sql, params = ?params, "fetch_optional");
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(decode_row))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            Value::Text(s) => query.bind(s.clone()),
            Value::Int32(n) => query.bind(*n),
            Value::Int64(n) => query.bind(*n),
            Value::Bool(b) => query.bind(*b),
            Value::Float(x) => query.bind(*x),
            Value::Timestamp(t) => query.bind(*t),
            Value::Uuid(u) => query.bind(*u),
        };
    }
    query
}

/// Decode every cell of a result row by the column's database type. Unknown
/// types fall back to a text read.
fn decode_row(row: &PgRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let name = column.name();
        let value = decode_cell(row, name, column.type_info().name());
        out.push(name, value);
    }
    out
}

fn decode_cell(row: &PgRow, name: &str, type_name: &str) -> Option<Value> {
    match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(name)
            .ok()
            .flatten()
            .map(|n| Value::Int32(i32::from(n))),
        "INT4" => row
            .try_get::<Option<i32>, _>(name)
            .ok()
            .flatten()
            .map(Value::Int32),
        "INT8" => row
            .try_get::<Option<i64>, _>(name)
            .ok()
            .flatten()
            .map(Value::Int64),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(name)
            .ok()
            .flatten()
            .map(|x| Value::Float(f64::from(x))),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(name)
            .ok()
            .flatten()
            .map(Value::Float),
        "BOOL" => row
            .try_get::<Option<bool>, _>(name)
            .ok()
            .flatten()
            .map(Value::Bool),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(name)
            .ok()
            .flatten()
            .map(Value::Uuid),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(name)
            .ok()
            .flatten()
            .map(Value::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(name)
            .ok()
            .flatten()
            .map(|t| Value::Timestamp(t.naive_utc())),
        _ => row
            .try_get::<Option<String>, _>(name)
            .ok()
            .flatten()
            .map(Value::Text),
    }
}
