//! Three-pass schema build: tables, then foreign keys, then join tables.
//! The later passes exist because FK and join-table DDL is only valid once
//! every referenced table exists.

use super::{create_table, foreign_key_statements, join_table_statements, SchemaCaches};
use crate::connector::Connector;
use crate::dialect::SqlDialect;
use crate::meta::EntitySet;
use std::sync::Arc;

/// What a build actually did. Skipped entries carry the logged reason.
#[derive(Debug, Default)]
pub struct SchemaReport {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct SchemaBuilder {
    connector: Arc<dyn Connector>,
    dialect: Arc<dyn SqlDialect>,
    caches: SchemaCaches,
}

impl SchemaBuilder {
    pub fn new(connector: Arc<dyn Connector>, dialect: Arc<dyn SqlDialect>) -> Self {
        SchemaBuilder {
            connector,
            dialect,
            caches: SchemaCaches::new(),
        }
    }

    /// Caches populated by the most recent build, for inspection.
    pub fn caches(&self) -> &SchemaCaches {
        &self.caches
    }

    /// Run the three passes over every registered entity, in registration
    /// order. Per-entity structural errors and per-statement database errors
    /// are logged and skipped so one broken entity cannot abort a pass.
    pub async fn build(&self, entities: &EntitySet) -> SchemaReport {
        self.caches.clear();
        let mut report = SchemaReport::default();

        tracing::info!(entities = entities.len(), "schema build: tables");
        for &descriptor in entities.descriptors() {
            match create_table(descriptor, self.dialect.as_ref(), &self.caches) {
                Ok(sql) => self.run(&sql, &mut report).await,
                Err(e) => {
                    tracing::error!(
                        entity = %descriptor.entity_name,
                        error = %e,
                        "table generation skipped"
                    );
                    report
                        .skipped
                        .push(format!("{}: {}", descriptor.entity_name, e));
                }
            }
        }

        tracing::info!(owners = self.caches.fk_owners().len(), "schema build: foreign keys");
        for owner in self.caches.fk_owners() {
            match foreign_key_statements(owner, self.dialect.as_ref()) {
                Ok(statements) => {
                    for sql in statements {
                        self.run(&sql, &mut report).await;
                    }
                }
                Err(e) => {
                    tracing::error!(entity = %owner.entity_name, error = %e, "foreign keys skipped");
                    report.skipped.push(format!("{}: {}", owner.entity_name, e));
                }
            }
        }

        tracing::info!(pairs = self.caches.join_pairs().len(), "schema build: join tables");
        for pair in self.caches.join_pairs() {
            match join_table_statements(&pair, self.dialect.as_ref()) {
                Ok(statements) => {
                    for sql in statements {
                        self.run(&sql, &mut report).await;
                    }
                }
                Err(e) => {
                    tracing::error!(table = %pair.table_name(), error = %e, "join table skipped");
                    report.skipped.push(format!("{}: {}", pair.table_name(), e));
                }
            }
        }

        report
    }

    async fn run(&self, sql: &str, report: &mut SchemaReport) {
        match self.connector.execute(sql, &[]).await {
            Ok(_) => report.executed.push(sql.to_string()),
            Err(e) => {
                tracing::warn!(sql = %sql, error = %e, "schema statement failed");
                report.skipped.push(format!("{}: {}", sql, e));
            }
        }
    }
}
