//! Walkthrough: declare two related entity types, derive their schema, and
//! run relationship-aware CRUD against a local PostgreSQL.
//!
//! Run from the repo root: `cargo run -p rowmap-demos`

use rowmap::{
    Connector, DatabaseConfig, Entity, EntityDescriptor, EntitySet, PgConnector, PostgresDialect,
    RepositoryRegistry, SchemaBuilder, Value, ValueType,
};
use std::sync::{Arc, LazyLock};

#[derive(Clone, Default, Debug)]
struct Author {
    id: Option<i64>,
    name: Option<String>,
    books: Vec<Book>,
}

#[derive(Clone, Default, Debug)]
struct Book {
    id: Option<i64>,
    title: Option<String>,
    author: Option<Box<Author>>,
}

impl Entity for Author {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Author>("Author")
                .id(
                    "id",
                    ValueType::Int64,
                    |a| a.id.map(Value::from),
                    |a, v| a.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |a| a.name.clone().map(Value::from),
                    |a, v| a.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .one_to_many::<Book>(
                    "books",
                    Some("author"),
                    |a| a.books.iter_mut().collect(),
                    |a, books| a.books = books,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

impl Entity for Book {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Book>("Book")
                .id(
                    "id",
                    ValueType::Int64,
                    |b| b.id.map(Value::from),
                    |b, v| b.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "title",
                    ValueType::Text,
                    |b| b.title.clone().map(Value::from),
                    |b, v| b.title = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .many_to_one::<Author>(
                    "author",
                    Some("books"),
                    |b| b.author.as_deref_mut(),
                    |b, a| b.author = Some(Box::new(a)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rowmap=info")),
        )
        .init();

    let config = DatabaseConfig::from_env();
    let connector = Arc::new(PgConnector::connect(&config).await?);

    let mut entities = EntitySet::new();
    entities.register::<Author>().register::<Book>();
    entities.validate()?;

    let builder = SchemaBuilder::new(connector.clone(), Arc::new(PostgresDialect));
    let report = builder.build(&entities).await;
    tracing::info!(
        executed = report.executed.len(),
        skipped = report.skipped.len(),
        "schema ready"
    );

    let registry = RepositoryRegistry::new(connector.clone());
    let authors = registry.repository::<Author>();
    let books = registry.repository::<Book>();

    let author = Author {
        name: Some("Iain Banks".into()),
        books: vec![
            Book {
                title: Some("Consider Phlebas".into()),
                ..Book::default()
            },
            Book {
                title: Some("The Player of Games".into()),
                ..Book::default()
            },
        ],
        ..Author::default()
    };
    let author = authors.save(author).await?;
    let author_id = author.id.ok_or("author id not generated")?;
    tracing::info!(author_id, "author saved with books");

    let loaded = authors
        .find_by_id(author_id)
        .await?
        .ok_or("saved author not found")?;
    for book in &loaded.books {
        tracing::info!(
            title = book.title.as_deref().unwrap_or("<untitled>"),
            "book on shelf"
        );
    }

    let total = books.count().await?;
    tracing::info!(total, "books on file");

    connector.close().await;
    Ok(())
}
