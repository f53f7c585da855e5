//! Dynamic cell values traded between the engine, statement builders, and connectors.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// One database cell value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Text(String),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    Float(f64),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
}

/// Static type of a column, independent of any one value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ValueType {
    Text,
    Int32,
    Int64,
    Bool,
    Float,
    Timestamp,
    Uuid,
    /// Opaque tag for column types the shipped dialect does not map.
    Custom(&'static str),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Text => f.write_str("text"),
            ValueType::Int32 => f.write_str("int32"),
            ValueType::Int64 => f.write_str("int64"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Float => f.write_str("float"),
            ValueType::Timestamp => f.write_str("timestamp"),
            ValueType::Uuid => f.write_str("uuid"),
            ValueType::Custom(tag) => write!(f, "custom:{}", tag),
        }
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Text(_) => ValueType::Text,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Bool(_) => ValueType::Bool,
            Value::Float(_) => ValueType::Float,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Uuid(_) => ValueType::Uuid,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer read tolerant of width: `Int64` values that fit in 32 bits convert.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(n) => Some(*n),
            Value::Int64(n) => i32::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(n) => Some(i64::from(*n)),
            Value::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int32(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

/// Identifier value usable as a hash key. Integer widths are normalized so a
/// 32-bit id and the 64-bit value read back from the database compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdValue {
    Int(i64),
    Text(String),
    Uuid(Uuid),
}

impl IdValue {
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Int32(n) => Some(IdValue::Int(i64::from(*n))),
            Value::Int64(n) => Some(IdValue::Int(*n)),
            Value::Text(s) => Some(IdValue::Text(s.clone())),
            Value::Uuid(u) => Some(IdValue::Uuid(*u)),
            Value::Bool(_) | Value::Float(_) | Value::Timestamp(_) => None,
        }
    }
}

/// One row returned by a connector: named cells in select order.
/// A `None` cell is SQL NULL.
#[derive(Clone, Debug, Default)]
pub struct Row {
    cells: Vec<(String, Option<Value>)>,
}

impl Row {
    pub fn new() -> Self {
        Row { cells: Vec::new() }
    }

    pub fn push(&mut self, name: impl Into<String>, value: Option<Value>) {
        self.cells.push((name.into(), value));
    }

    /// Cell by column name; `None` for both an absent column and SQL NULL.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// First cell of the row, for single-column reads (returned ids, counts).
    pub fn first_value(&self) -> Option<&Value> {
        self.cells.first().and_then(|(_, v)| v.as_ref())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[(String, Option<Value>)] {
        &self.cells
    }
}
