//! Dynamically typed SQL values.

use std::fmt;

use serde::{Serialize, Serializer};

/// A single column value or bound parameter.
///
/// Attributes of a record are always scalar (`Null` through `Bytes`).
/// [`Value::Array`] only appears as the operand of `IN`, `NOT IN` and
/// `BETWEEN` predicates, where it is expanded into one placeholder per
/// element; drivers refuse to bind it directly.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit integer.
    BigInt(i64),
    /// 64-bit float.
    Double(f64),
    /// Text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A sequence of values (predicate operands only).
    Array(Vec<Value>),
}

impl Value {
    /// True for `Value::Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the scalar variants.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_))
    }

    /// Borrow the text content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. Booleans map to 0/1 and whole floats convert.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
            Value::Double(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Float view.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::BigInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean view. Integers are truthy when non-zero.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Borrow the elements of an array operand.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Key used to match rows across a relation.
    ///
    /// Integers, booleans, whole floats and text holding an integer in
    /// canonical form (`"7"`, `"-7"`) collapse to [`RelationKey::Int`] so a
    /// `TEXT` foreign key still matches an integer primary key. Any other text
    /// (`"007"`, `" 7"`, `"+7"`) stays [`RelationKey::Text`] and is bound
    /// exactly as read. Returns `None` for NULL and values that cannot be keys.
    #[must_use]
    pub fn relation_key(&self) -> Option<RelationKey> {
        match self {
            Value::Null | Value::Array(_) | Value::Bytes(_) => None,
            Value::Text(s) => Some(match s.parse::<i64>() {
                Ok(n) if n.to_string() == *s => RelationKey::Int(n),
                _ => RelationKey::Text(s.clone()),
            }),
            Value::Double(f) if f.fract() != 0.0 => None,
            other => other.as_i64().map(RelationKey::Int),
        }
    }
}

/// Hashable identity of a key column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationKey {
    /// Integer key.
    Int(i64),
    /// Non-numeric text key.
    Text(String),
}

impl From<RelationKey> for Value {
    fn from(key: RelationKey) -> Self {
        match key {
            RelationKey::Int(v) => Value::BigInt(v),
            RelationKey::Text(s) => Value::Text(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::BigInt(v) => serializer.serialize_i64(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(items) => items.serialize(serializer),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::BigInt(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::BigInt(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}
