//! Conversions between miniorm values and SQLite storage classes.

use miniorm_core::{Error, Result, Value};
use rusqlite::types::{Value as SqliteValue, ValueRef};

/// Convert a bound value to a driver value.
///
/// Booleans are stored as `0`/`1`. Arrays have no SQLite representation and
/// are rejected; the query builder expands them into one binding per element
/// before they get here.
pub fn to_sqlite(name: &str, value: &Value) -> Result<SqliteValue> {
    Ok(match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::BigInt(n) => SqliteValue::Integer(*n),
        Value::Double(f) => SqliteValue::Real(*f),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Array(_) => {
            return Err(Error::invalid_argument(format!(
                "Cannot bind an array to placeholder {name}"
            )));
        }
    })
}

/// Convert a column read from a result row.
pub fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::BigInt(n),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    }
}
