//! Entity and key contracts.
//!
//! # Responsibility
//! - Let callers declare table/column layout and a key accessor per record type.
//! - Provide value snapshots used by change tracking and error messages.
//!
//! # Invariants
//! - `Entity::values()` is aligned with `Entity::COLUMNS` (same length, same order).
//! - `COLUMNS` never repeats `KEY_COLUMN`.

use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use uuid::Uuid;

/// Ordered `(column, value)` pairs captured from one record.
pub type FieldSnapshot = Vec<(&'static str, Value)>;

/// SQLite column affinity, derived from a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    /// Also the affinity of untyped columns: values are stored as given.
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    /// Applies SQLite's declared-type rules, first match wins.
    pub fn of_declared(declared: &str) -> Self {
        let declared = declared.to_ascii_uppercase();
        if declared.contains("INT") {
            Self::Integer
        } else if ["CHAR", "CLOB", "TEXT"]
            .iter()
            .any(|marker| declared.contains(marker))
        {
            Self::Text
        } else if declared.is_empty() || declared.contains("BLOB") {
            Self::Blob
        } else if ["REAL", "FLOA", "DOUB"]
            .iter()
            .any(|marker| declared.contains(marker))
        {
            Self::Real
        } else {
            Self::Numeric
        }
    }

    /// Whether a column of this affinity stores `key` values unchanged.
    pub fn stores(self, key: Affinity) -> bool {
        self == key
            || self == Self::Blob
            || (self == Self::Numeric && key == Self::Integer)
    }
}

/// A value usable as a single-column primary key.
pub trait KeyValue: Clone + Eq + Hash + Display + Debug + 'static {
    /// Affinity of the values produced by `to_sql_value`.
    const AFFINITY: Affinity;

    fn to_sql_value(&self) -> Value;
}

impl KeyValue for i64 {
    const AFFINITY: Affinity = Affinity::Integer;

    fn to_sql_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl KeyValue for i32 {
    const AFFINITY: Affinity = Affinity::Integer;

    fn to_sql_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl KeyValue for String {
    const AFFINITY: Affinity = Affinity::Text;

    fn to_sql_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

/// Stored as hyphenated text.
impl KeyValue for Uuid {
    const AFFINITY: Affinity = Affinity::Text;

    fn to_sql_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

/// A record type persisted in one table.
///
/// Implementations replace runtime reflection: the key accessor and column
/// layout are declared once, statically.
pub trait Entity: Clone + Send + 'static {
    type Key: KeyValue;

    /// Human-readable type name used in error messages.
    const TYPE_NAME: &'static str;
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    /// Non-key columns, in the order produced by `values()`.
    const COLUMNS: &'static [&'static str];

    fn key(&self) -> Self::Key;

    /// Current non-key column values, aligned with `COLUMNS`.
    fn values(&self) -> Vec<Value>;

    /// Decodes one row selected as `KEY_COLUMN` followed by `COLUMNS`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Non-key values of `entity`, checked against `COLUMNS` in debug builds.
pub(crate) fn column_values<E: Entity>(entity: &E) -> Vec<Value> {
    let values = entity.values();
    debug_assert_eq!(
        values.len(),
        E::COLUMNS.len(),
        "{} values() must align with COLUMNS",
        E::TYPE_NAME
    );
    values
}

/// Renders a snapshot as `{col: value, ...}`.
pub fn render_fields(fields: &[(&'static str, Value)]) -> String {
    let body = fields
        .iter()
        .map(|(column, value)| format!("{column}: {}", render_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{body}}}")
}

pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => text.clone(),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}
