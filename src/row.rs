//! Result rows and the unified value type.
//!
//! This module contains:
//! - `Value` - A single PostgreSQL value in driver-agnostic form
//! - `ColumnInfo` - Metadata about a column in a result set
//! - `Row` - One result row, with positional and by-name access
//! - `RowSet` - A full result set, shapeable per [`RowShape`]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RowShape;

/// A single value read from (or bound into) a PostgreSQL statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value (true/false)
    Bool(bool),
    /// 16-bit signed integer (`smallint`)
    Int16(i16),
    /// 32-bit signed integer (`integer`)
    Int32(i32),
    /// 64-bit signed integer (`bigint`)
    Int64(i64),
    /// 32-bit floating point (`real`)
    Float32(f32),
    /// 64-bit floating point (`double precision`)
    Float64(f64),
    /// Text/string value
    Text(String),
    /// Binary data (`bytea`)
    Bytes(Vec<u8>),
    /// Date without time
    Date(NaiveDate),
    /// Time without date
    Time(NaiveTime),
    /// Date and time without timezone
    DateTime(NaiveDateTime),
    /// Date and time with timezone (stored as UTC)
    DateTimeTz(DateTime<Utc>),
    /// Arbitrary-precision numeric
    Decimal(Decimal),
    /// UUID
    Uuid(Uuid),
    /// JSON value (`json`/`jsonb`)
    Json(serde_json::Value),
    /// Array of values (same element type)
    Array(Vec<Value>),
    /// Server type without a standard mapping; kept as display text.
    Other {
        /// The PostgreSQL type name
        type_name: String,
        /// String representation for display
        display: String,
    },
}

impl Value {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name for display purposes
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::DateTimeTz(_) => "datetimetz",
            Value::Decimal(_) => "decimal",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Other { .. } => "other",
        }
    }

    /// Convert this value to a display string
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Float32(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => format!("\\x{}", hex::encode(b)),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::DateTimeTz(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f %Z").to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::Uuid(u) => u.to_string(),
            Value::Json(j) => serde_json::to_string(j).unwrap_or_else(|_| "{}".to_string()),
            Value::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.to_display_string()).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Other { display, .. } => display.clone(),
        }
    }

    /// Try to extract as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to extract as an i64 (will widen smaller integers)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to extract as an f64 (will widen f32)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to extract as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract as bytes reference
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// Metadata about a column in a result set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// PostgreSQL type name
    pub type_name: String,
    /// Column position (0-indexed)
    pub ordinal: usize,
}

impl ColumnInfo {
    /// Create a new column info
    pub fn new(name: String, type_name: String, ordinal: usize) -> Self {
        Self {
            name,
            type_name,
            ordinal,
        }
    }
}

/// One result row. Column metadata is shared across all rows of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[ColumnInfo]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row over shared column metadata.
    pub fn new(columns: Arc<[ColumnInfo]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Get the number of values in this row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column metadata for this row
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Get a value by position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name (first match wins)
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        self.values.get(idx)
    }

    /// Iterate over values
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Consume the row into its positional values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Consume the row into ordered (name, value) pairs
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .zip(self.values)
            .collect()
    }

    /// Consume the row into a name-keyed map. Duplicate names keep the
    /// last value.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.into_pairs().into_iter().collect()
    }
}

impl IntoIterator for Row {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Rows materialized according to a [`RowShape`].
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedRows {
    /// Positional values per row
    Tuples(Vec<Vec<Value>>),
    /// Ordered (name, value) pairs per row
    Records(Vec<Vec<(String, Value)>>),
    /// Name-keyed map per row
    Maps(Vec<HashMap<String, Value>>),
}

impl ShapedRows {
    /// Number of rows regardless of shape
    pub fn len(&self) -> usize {
        match self {
            ShapedRows::Tuples(rows) => rows.len(),
            ShapedRows::Records(rows) => rows.len(),
            ShapedRows::Maps(rows) => rows.len(),
        }
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A full result set: shared column metadata plus the rows.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Arc<[ColumnInfo]>,
    rows: Vec<Row>,
}

impl RowSet {
    /// Create a result set from columns and rows.
    pub fn new(columns: Arc<[ColumnInfo]>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// An empty result set with no column metadata.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Column metadata
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// The rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, if any
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Consume into the rows
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Materialize the rows in the requested shape.
    pub fn shaped(self, shape: RowShape) -> ShapedRows {
        match shape {
            RowShape::Tuple => {
                ShapedRows::Tuples(self.rows.into_iter().map(Row::into_values).collect())
            }
            RowShape::Record => {
                ShapedRows::Records(self.rows.into_iter().map(Row::into_pairs).collect())
            }
            RowShape::Map => ShapedRows::Maps(self.rows.into_iter().map(Row::into_map).collect()),
        }
    }
}

impl IntoIterator for RowSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Arc<[ColumnInfo]> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| ColumnInfo::new(n.to_string(), "text".to_string(), i))
            .collect()
    }

    #[test]
    fn test_value_null_check() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());
        assert!(!Value::Int32(42).is_null());
        assert!(!Value::Text("hello".to_string()).is_null());
    }

    #[test]
    fn test_value_display_string() {
        assert_eq!(Value::Null.to_display_string(), "NULL");
        assert_eq!(Value::Bool(true).to_display_string(), "true");
        assert_eq!(Value::Int32(42).to_display_string(), "42");
        assert_eq!(Value::Int64(-123).to_display_string(), "-123");
        assert_eq!(Value::Float64(3.14).to_display_string(), "3.14");
        assert_eq!(Value::Text("hello".to_string()).to_display_string(), "hello");
    }

    #[test]
    fn test_value_bytes_display() {
        let bytes = Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(bytes.to_display_string(), "\\xdeadbeef");
    }

    #[test]
    fn test_value_array_display() {
        let arr = Value::Array(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]);
        assert_eq!(arr.to_display_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_value_from_floats() {
        let single: Value = 1.5f32.into();
        assert_eq!(single, Value::Float32(1.5));

        let double: Value = 2.5f64.into();
        assert_eq!(double, Value::Float64(2.5));
    }

    #[test]
    fn test_value_from_option() {
        let some_val: Value = Some(42i32).into();
        assert_eq!(some_val, Value::Int32(42));

        let none_val: Value = Option::<i32>::None.into();
        assert_eq!(none_val, Value::Null);
    }

    #[test]
    fn test_row_access() {
        let cols = columns(&["id", "name"]);
        let row = Row::new(cols, vec![Value::Int32(7), Value::from("ada")]);

        assert_eq!(row.len(), 2);
        assert_eq!(row.get(0), Some(&Value::Int32(7)));
        assert_eq!(row.get_named("name"), Some(&Value::from("ada")));
        assert_eq!(row.get_named("missing"), None);
        assert_eq!(row.get(2), None);
    }

    #[test]
    fn test_row_into_pairs_preserves_order() {
        let cols = columns(&["b", "a"]);
        let row = Row::new(cols, vec![Value::Int32(2), Value::Int32(1)]);

        let pairs = row.into_pairs();
        assert_eq!(pairs[0], ("b".to_string(), Value::Int32(2)));
        assert_eq!(pairs[1], ("a".to_string(), Value::Int32(1)));
    }

    #[test]
    fn test_rowset_shaping() {
        let cols = columns(&["id", "name"]);
        let rows = vec![
            Row::new(cols.clone(), vec![Value::Int32(1), Value::from("x")]),
            Row::new(cols.clone(), vec![Value::Int32(2), Value::from("y")]),
        ];
        let set = RowSet::new(cols, rows);

        match set.clone().shaped(RowShape::Tuple) {
            ShapedRows::Tuples(t) => {
                assert_eq!(t.len(), 2);
                assert_eq!(t[0], vec![Value::Int32(1), Value::from("x")]);
            }
            other => panic!("expected tuples, got {other:?}"),
        }

        match set.clone().shaped(RowShape::Record) {
            ShapedRows::Records(r) => {
                assert_eq!(r[1][0], ("id".to_string(), Value::Int32(2)));
            }
            other => panic!("expected records, got {other:?}"),
        }

        match set.shaped(RowShape::Map) {
            ShapedRows::Maps(m) => {
                assert_eq!(m[0].get("name"), Some(&Value::from("x")));
            }
            other => panic!("expected maps, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_rowset() {
        let set = RowSet::empty();
        assert!(set.is_empty());
        assert!(set.columns().is_empty());
        assert!(set.first().is_none());
    }
}
