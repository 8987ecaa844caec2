//! Conversion between SQLx's PostgreSQL types and the unified `Value` type.
//!
//! Decoding dispatches on the server's type name and falls back to a string
//! representation for types without a standard mapping. Encoding binds a
//! `Value` onto a query; homogeneous arrays of the common element types bind
//! as PostgreSQL arrays, anything else is a statement error.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgRow, PgSslMode, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Column, Encode, Postgres, Row as _, Type, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::config::SslMode;
use crate::error::{Error, Result};
use crate::row::{ColumnInfo, Row, Value};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Build column metadata from the first row of a result.
pub(crate) fn build_columns(pg_row: &PgRow) -> Arc<[ColumnInfo]> {
    pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            ColumnInfo::new(
                col.name().to_string(),
                col.type_info().name().to_string(),
                idx,
            )
        })
        .collect()
}

/// Convert a PostgreSQL row into a `Row` over shared column metadata.
pub(crate) fn decode_row(pg_row: &PgRow, columns: &Arc<[ColumnInfo]>) -> Row {
    let values = pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| extract_value(pg_row, idx, col.type_info().name()))
        .collect();

    Row::new(Arc::clone(columns), values)
}

fn extract_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    decode_by_type(row, index, type_name)
}

/// Decode a value based on its PostgreSQL type name.
fn decode_by_type(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" | "SMALLSERIAL" => row
            .try_get::<i16, _>(index)
            .map(Value::Int16)
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" | "SERIAL" => row
            .try_get::<i32, _>(index)
            .map(Value::Int32)
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" | "BIGSERIAL" => row
            .try_get::<i64, _>(index)
            .map(Value::Int64)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<f32, _>(index)
            .map(Value::Float32)
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<f64, _>(index)
            .map(Value::Float64)
            .unwrap_or(Value::Null),

        "NUMERIC" | "DECIMAL" => row
            .try_get::<Decimal, _>(index)
            .map(Value::Decimal)
            .unwrap_or(Value::Null),

        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(Value::Date)
            .unwrap_or(Value::Null),

        "TIME" | "TIMETZ" => row
            .try_get::<NaiveTime, _>(index)
            .map(Value::Time)
            .unwrap_or(Value::Null),

        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(Value::DateTime)
            .unwrap_or(Value::Null),

        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(Value::DateTimeTz)
            .unwrap_or(Value::Null),

        "UUID" => row
            .try_get::<Uuid, _>(index)
            .map(Value::Uuid)
            .unwrap_or(Value::Null),

        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(index)
            .map(Value::Json)
            .unwrap_or(Value::Null),

        "_INT4" | "INT4[]" => row
            .try_get::<Vec<i32>, _>(index)
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int32).collect()))
            .unwrap_or(Value::Null),

        "_INT8" | "INT8[]" => row
            .try_get::<Vec<i64>, _>(index)
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int64).collect()))
            .unwrap_or(Value::Null),

        "_TEXT" | "TEXT[]" | "_VARCHAR" | "VARCHAR[]" => row
            .try_get::<Vec<String>, _>(index)
            .map(|arr| Value::Array(arr.into_iter().map(Value::Text).collect()))
            .unwrap_or(Value::Null),

        "_BOOL" | "BOOL[]" => row
            .try_get::<Vec<bool>, _>(index)
            .map(|arr| Value::Array(arr.into_iter().map(Value::Bool).collect()))
            .unwrap_or(Value::Null),

        "_FLOAT8" | "FLOAT8[]" => row
            .try_get::<Vec<f64>, _>(index)
            .map(|arr| Value::Array(arr.into_iter().map(Value::Float64).collect()))
            .unwrap_or(Value::Null),

        _ => decode_as_string_fallback(row, index, type_name),
    }
}

/// Fallback for types without a standard mapping: keep a display string.
fn decode_as_string_fallback(row: &PgRow, index: usize, type_name: &str) -> Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        return Value::Other {
            type_name: type_name.to_string(),
            display: s,
        };
    }

    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Other {
            type_name: type_name.to_string(),
            display: v.to_string(),
        };
    }

    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Other {
            type_name: type_name.to_string(),
            display: v.to_string(),
        };
    }

    Value::Other {
        type_name: type_name.to_string(),
        display: "<unknown>".to_string(),
    }
}

/// NULL with no declared parameter type. Declaring a concrete type (for
/// example text) would make the server reject NULLs destined for columns
/// without an assignment cast from it; `unknown` lets the server infer the
/// column's type the way it does for an untyped literal.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("unknown")
    }
}

impl<'q> Encode<'q, Postgres> for UntypedNull {
    fn encode_by_ref(
        &self,
        _buf: &mut PgArgumentBuffer,
    ) -> std::result::Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Bind a `Value` onto a query as its next positional parameter.
pub(crate) fn bind_value(query: PgQuery<'_>, value: Value) -> Result<PgQuery<'_>> {
    let query = match value {
        Value::Null => query.bind(UntypedNull),
        Value::Bool(v) => query.bind(v),
        Value::Int16(v) => query.bind(v),
        Value::Int32(v) => query.bind(v),
        Value::Int64(v) => query.bind(v),
        Value::Float32(v) => query.bind(v),
        Value::Float64(v) => query.bind(v),
        Value::Text(v) => query.bind(v),
        Value::Bytes(v) => query.bind(v),
        Value::Date(v) => query.bind(v),
        Value::Time(v) => query.bind(v),
        Value::DateTime(v) => query.bind(v),
        Value::DateTimeTz(v) => query.bind(v),
        Value::Decimal(v) => query.bind(v),
        Value::Uuid(v) => query.bind(v),
        Value::Json(v) => query.bind(v),
        Value::Array(items) => bind_array(query, items)?,
        Value::Other { type_name, .. } => {
            return Err(Error::statement(format!(
                "cannot bind parameter of type `{type_name}`"
            )));
        }
    };
    Ok(query)
}

/// Bind a homogeneous array parameter. Element type is taken from the first
/// element; mixed arrays are rejected.
fn bind_array(query: PgQuery<'_>, items: Vec<Value>) -> Result<PgQuery<'_>> {
    fn collect<T>(
        items: Vec<Value>,
        extract: impl Fn(Value) -> Option<T>,
    ) -> Result<Vec<T>> {
        items
            .into_iter()
            .map(|v| extract(v).ok_or_else(|| Error::statement("mixed-type array parameter")))
            .collect()
    }

    match items.first() {
        // an empty array carries no element type; bind as text[]
        None => Ok(query.bind(Vec::<String>::new())),
        Some(Value::Int32(_)) => {
            let arr = collect(items, |v| match v {
                Value::Int32(i) => Some(i),
                _ => None,
            })?;
            Ok(query.bind(arr))
        }
        Some(Value::Int64(_)) => {
            let arr = collect(items, |v| match v {
                Value::Int64(i) => Some(i),
                _ => None,
            })?;
            Ok(query.bind(arr))
        }
        Some(Value::Text(_)) => {
            let arr = collect(items, |v| match v {
                Value::Text(s) => Some(s),
                _ => None,
            })?;
            Ok(query.bind(arr))
        }
        Some(Value::Bool(_)) => {
            let arr = collect(items, |v| match v {
                Value::Bool(b) => Some(b),
                _ => None,
            })?;
            Ok(query.bind(arr))
        }
        Some(Value::Float64(_)) => {
            let arr = collect(items, |v| match v {
                Value::Float64(f) => Some(f),
                _ => None,
            })?;
            Ok(query.bind(arr))
        }
        Some(other) => Err(Error::statement(format!(
            "unsupported array element type `{}`",
            other.type_name()
        ))),
    }
}

/// Map the configured SSL mode to SQLx's.
pub(crate) fn map_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disable => PgSslMode::Disable,
        SslMode::Prefer => PgSslMode::Prefer,
        SslMode::Require => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyFull => PgSslMode::VerifyFull,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_mapping() {
        assert!(matches!(map_ssl_mode(SslMode::Disable), PgSslMode::Disable));
        assert!(matches!(map_ssl_mode(SslMode::Prefer), PgSslMode::Prefer));
        assert!(matches!(map_ssl_mode(SslMode::Require), PgSslMode::Require));
        assert!(matches!(
            map_ssl_mode(SslMode::VerifyFull),
            PgSslMode::VerifyFull
        ));
    }

    #[test]
    fn test_bind_rejects_other() {
        let query = sqlx::query("SELECT $1");
        let err = bind_value(
            query,
            Value::Other {
                type_name: "point".to_string(),
                display: "(1,2)".to_string(),
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Statement(_)));
    }

    #[test]
    fn test_bind_rejects_mixed_array() {
        let query = sqlx::query("SELECT $1");
        let err = bind_value(
            query,
            Value::Array(vec![Value::Int32(1), Value::Text("x".to_string())]),
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Statement(_)));
    }

    #[test]
    fn test_null_binds_with_unspecified_type() {
        // a concretely typed null (e.g. text) would be rejected for
        // integer/timestamp/uuid columns at prepare time
        assert_eq!(
            <UntypedNull as Type<Postgres>>::type_info().name(),
            "unknown"
        );

        let query = sqlx::query("SELECT $1");
        assert!(bind_value(query, Value::Null).is_ok());
    }

    #[test]
    fn test_bind_accepts_scalars_and_arrays() {
        let query = sqlx::query("SELECT $1");
        assert!(bind_value(query, Value::Int64(7)).is_ok());

        let query = sqlx::query("SELECT $1");
        assert!(bind_value(query, Value::Array(vec![Value::Int32(1), Value::Int32(2)])).is_ok());

        let query = sqlx::query("SELECT $1");
        assert!(bind_value(query, Value::Null).is_ok());
    }
}
