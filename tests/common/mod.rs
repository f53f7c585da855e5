//! Shared test backing: an in-memory connector speaking the engine's
//! statement grammar, plus the entity fixtures the suites operate on.

#![allow(dead_code)]

use async_trait::async_trait;
use rowmap::{
    Connector, CrudRepository, Entity, EntityDescriptor, OrmError, Repository, Row, Value,
    ValueType,
};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

type MemRow = Vec<(String, Value)>;

#[derive(Default)]
struct MemTable {
    next_id: i64,
    rows: Vec<MemRow>,
}

/// In-memory stand-in for PostgreSQL that interprets exactly the statements
/// the statement builders emit. Tables materialize on first insert; generated
/// identifiers count up from one per table.
pub struct MemoryConnector {
    tables: Mutex<HashMap<String, MemTable>>,
    statements: Mutex<Vec<String>>,
}

impl MemoryConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryConnector {
            tables: Mutex::new(HashMap::new()),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    pub fn rows(&self, table: &str) -> Vec<MemRow> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or_else(Vec::new, |t| t.rows.clone())
    }

    pub fn cell(&self, table: &str, row: usize, column: &str) -> Option<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .and_then(|t| t.rows.get(row))
            .and_then(|r| r.iter().find(|(n, _)| n == column).map(|(_, v)| v.clone()))
    }

    fn log(&self, sql: &str) {
        self.statements.lock().unwrap().push(sql.to_string());
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Option<Row> {
        let rest = sql.strip_prefix("INSERT INTO ").expect("insert statement");
        let (table, spec) = rest.split_once(' ').expect("table name");
        let (body, returning) = match spec.split_once(" RETURNING ") {
            Some((body, column)) => (body, Some(column)),
            None => (spec, None),
        };
        let mut row: MemRow = Vec::new();
        if body != "DEFAULT VALUES" {
            let columns = body
                .split_once('(')
                .and_then(|(_, tail)| tail.split_once(')'))
                .map(|(columns, _)| columns)
                .expect("column list");
            for (i, column) in columns.split(", ").enumerate() {
                row.push((column.to_string(), params[i].clone()));
            }
        }
        let mut tables = self.tables.lock().unwrap();
        let entry = tables.entry(table.to_string()).or_default();
        let returned = returning.map(|id_column| {
            entry.next_id += 1;
            row.push((id_column.to_string(), Value::Int64(entry.next_id)));
            let mut out = Row::new();
            out.push(id_column, Some(Value::Int64(entry.next_id)));
            out
        });
        entry.rows.push(row);
        returned
    }

    fn update(&self, sql: &str, params: &[Value]) -> u64 {
        let rest = sql.strip_prefix("UPDATE ").expect("update statement");
        let (table, rest) = rest.split_once(" SET ").expect("set clause");
        let (sets, where_clause) = rest.split_once(" WHERE ").expect("where clause");
        let (where_column, _) = where_clause.split_once(" = ").expect("where column");
        let where_value = params.last().expect("where parameter");
        let mut tables = self.tables.lock().unwrap();
        let Some(entry) = tables.get_mut(table) else {
            return 0;
        };
        let mut updated = 0;
        for row in entry.rows.iter_mut() {
            if !cell_matches(row, where_column, where_value) {
                continue;
            }
            for set in sets.split(", ") {
                let (column, placeholder) = set.split_once(" = $").expect("set pair");
                let index: usize = placeholder.parse().expect("placeholder index");
                upsert(row, column, params[index - 1].clone());
            }
            updated += 1;
        }
        updated
    }

    fn delete(&self, sql: &str, params: &[Value]) -> u64 {
        let rest = sql.strip_prefix("DELETE FROM ").expect("delete statement");
        let mut tables = self.tables.lock().unwrap();
        match rest.split_once(" WHERE ") {
            None => tables.get_mut(rest).map_or(0, |t| {
                let n = t.rows.len();
                t.rows.clear();
                n as u64
            }),
            Some((table, clause)) => {
                let (column, _) = clause.split_once(" = ").expect("where column");
                let value = &params[0];
                tables.get_mut(table).map_or(0, |t| {
                    let before = t.rows.len();
                    t.rows.retain(|row| !cell_matches(row, column, value));
                    (before - t.rows.len()) as u64
                })
            }
        }
    }

    fn select(&self, sql: &str, params: &[Value]) -> Vec<Row> {
        let rest = sql.strip_prefix("SELECT ").expect("select statement");
        let (projection, rest) = rest.split_once(" FROM ").expect("from clause");
        let (table, where_clause) = match rest.split_once(" WHERE ") {
            Some((table, clause)) => (table, Some(clause)),
            None => (rest, None),
        };
        let tables = self.tables.lock().unwrap();
        let Some(entry) = tables.get(table) else {
            return Vec::new();
        };
        let matched: Vec<&MemRow> = match where_clause {
            None => entry.rows.iter().collect(),
            Some("1 = 0") => Vec::new(),
            Some(clause) if clause.contains(" IN (") => {
                let (column, _) = clause.split_once(" IN (").expect("in clause");
                entry
                    .rows
                    .iter()
                    .filter(|row| params.iter().any(|v| cell_matches(row, column, v)))
                    .collect()
            }
            Some(clause) => {
                let conditions: Vec<(&str, &Value)> = clause
                    .split(" AND ")
                    .map(|part| {
                        let (column, placeholder) = part.split_once(" = $").expect("condition");
                        let index: usize = placeholder.parse().expect("placeholder index");
                        (column, &params[index - 1])
                    })
                    .collect();
                entry
                    .rows
                    .iter()
                    .filter(|row| conditions.iter().all(|(c, v)| cell_matches(row, c, v)))
                    .collect()
            }
        };
        match projection {
            "COUNT(*)" => {
                let mut row = Row::new();
                row.push("count", Some(Value::Int64(matched.len() as i64)));
                vec![row]
            }
            "1" => matched
                .iter()
                .map(|_| {
                    let mut row = Row::new();
                    row.push("exists", Some(Value::Int32(1)));
                    row
                })
                .collect(),
            "*" => matched.iter().map(|r| to_row(r)).collect(),
            column => matched
                .iter()
                .map(|r| {
                    let mut row = Row::new();
                    row.push(
                        column,
                        r.iter().find(|(n, _)| n == column).map(|(_, v)| v.clone()),
                    );
                    row
                })
                .collect(),
        }
    }
}

fn cell_matches(row: &MemRow, column: &str, value: &Value) -> bool {
    row.iter()
        .find(|(n, _)| n == column)
        .is_some_and(|(_, cell)| values_equal(cell, value))
}

/// Integer widths compare equal, as they would inside the database.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn upsert(row: &mut MemRow, column: &str, value: Value) {
    match row.iter_mut().find(|(n, _)| n == column) {
        Some((_, cell)) => *cell = value,
        None => row.push((column.to_string(), value)),
    }
}

fn to_row(cells: &MemRow) -> Row {
    let mut row = Row::new();
    for (name, value) in cells {
        row.push(name.clone(), Some(value.clone()));
    }
    row
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, OrmError> {
        self.log(sql);
        if sql.starts_with("INSERT INTO ") {
            self.insert(sql, params);
            Ok(1)
        } else if sql.starts_with("UPDATE ") {
            Ok(self.update(sql, params))
        } else if sql.starts_with("DELETE FROM ") {
            Ok(self.delete(sql, params))
        } else if sql.starts_with("CREATE TABLE ") || sql.starts_with("ALTER TABLE ") {
            // DDL is accepted and discarded; tables materialize on insert.
            Ok(0)
        } else {
            Err(OrmError::Unsupported(sql.to_string()))
        }
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, OrmError> {
        self.log(sql);
        if !sql.starts_with("SELECT ") {
            return Err(OrmError::Unsupported(sql.to_string()));
        }
        Ok(self.select(sql, params))
    }

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>, OrmError> {
        self.log(sql);
        if sql.starts_with("INSERT INTO ") {
            return Ok(self.insert(sql, params));
        }
        if !sql.starts_with("SELECT ") {
            return Err(OrmError::Unsupported(sql.to_string()));
        }
        Ok(self.select(sql, params).into_iter().next())
    }

    async fn close(&self) {}
}

#[derive(Clone, Default)]
pub struct User {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: i32,
}

impl Entity for User {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<User>("User")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .column(
                    "age",
                    ValueType::Int32,
                    |e| Some(Value::from(e.age)),
                    |e, v| e.age = v.and_then(|v| v.as_i32()).unwrap_or_default(),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub struct Parent {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub children: Vec<Child>,
}

impl Entity for Parent {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Parent>("Parent")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .one_to_many::<Child>(
                    "children",
                    Some("parent"),
                    |e| e.children.iter_mut().collect(),
                    |e, children| e.children = children,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub struct Child {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub parent: Option<Box<Parent>>,
}

impl Entity for Child {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Child>("Child")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .many_to_one::<Parent>(
                    "parent",
                    Some("children"),
                    |e| e.parent.as_deref_mut(),
                    |e, parent| e.parent = Some(Box::new(parent)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub struct Driver {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub license: Option<Box<License>>,
}

impl Entity for Driver {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Driver>("Driver")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .one_to_one::<License>(
                    "license",
                    |e| e.license.as_deref_mut(),
                    |e, license| e.license = Some(Box::new(license)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub struct License {
    pub id: Option<i64>,
    pub number: Option<String>,
    pub driver: Option<Box<Driver>>,
}

impl Entity for License {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<License>("License")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "number",
                    ValueType::Text,
                    |e| e.number.clone().map(Value::from),
                    |e, v| e.number = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .one_to_one::<Driver>(
                    "driver",
                    |e| e.driver.as_deref_mut(),
                    |e, driver| e.driver = Some(Box::new(driver)),
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub struct Course {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub students: Vec<Student>,
}

impl Entity for Course {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Course>("Course")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "title",
                    ValueType::Text,
                    |e| e.title.clone().map(Value::from),
                    |e, v| e.title = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .many_to_many::<Student>(
                    "students",
                    |e| e.students.iter_mut().collect(),
                    |e, students| e.students = students,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

#[derive(Clone, Default)]
pub struct Student {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub courses: Vec<Course>,
}

impl Entity for Student {
    type Id = i64;

    fn descriptor() -> &'static EntityDescriptor {
        static DESCRIPTOR: LazyLock<EntityDescriptor> = LazyLock::new(|| {
            EntityDescriptor::builder::<Student>("Student")
                .id(
                    "id",
                    ValueType::Int64,
                    |e| e.id.map(Value::from),
                    |e, v| e.id = v.and_then(|v| v.as_i64()),
                )
                .column(
                    "name",
                    ValueType::Text,
                    |e| e.name.clone().map(Value::from),
                    |e, v| e.name = v.and_then(|v| v.as_text().map(str::to_string)),
                )
                .nullable()
                .many_to_many::<Course>(
                    "courses",
                    |e| e.courses.iter_mut().collect(),
                    |e, courses| e.courses = courses,
                )
                .build()
        });
        LazyLock::force(&DESCRIPTOR)
    }
}

/// Hand-written repository layering a domain query over the generic engine,
/// the shape consumers register in place of the default.
pub struct UserRepository {
    inner: CrudRepository<User>,
}

impl UserRepository {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        UserRepository {
            inner: CrudRepository::new(connector),
        }
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Vec<User>, OrmError> {
        self.inner.find_by_field("name", Value::from(name)).await
    }
}

#[async_trait]
impl Repository<User> for UserRepository {
    async fn save(&self, entity: User) -> Result<User, OrmError> {
        self.inner.save(entity).await
    }

    async fn save_all(&self, entities: Vec<User>) -> Result<Vec<User>, OrmError> {
        self.inner.save_all(entities).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, OrmError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<User>, OrmError> {
        self.inner.find_all().await
    }

    async fn find_all_by_id(&self, ids: Vec<i64>) -> Result<Vec<User>, OrmError> {
        self.inner.find_all_by_id(ids).await
    }

    async fn exists_by_id(&self, id: i64) -> Result<bool, OrmError> {
        self.inner.exists_by_id(id).await
    }

    async fn count(&self) -> Result<u64, OrmError> {
        self.inner.count().await
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), OrmError> {
        self.inner.delete_by_id(id).await
    }

    async fn delete(&self, entity: User) -> Result<(), OrmError> {
        self.inner.delete(entity).await
    }

    async fn delete_all_by_id(&self, ids: Vec<i64>) -> Result<(), OrmError> {
        self.inner.delete_all_by_id(ids).await
    }

    async fn delete_all(&self) -> Result<(), OrmError> {
        self.inner.delete_all().await
    }
}
