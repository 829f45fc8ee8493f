//! Ordered column maps returned by queries and held by model instances.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::relationship::Related;
use crate::value::Value;

/// An ordered mapping from column name to [`Value`].
///
/// Column order follows the engine's result order (or insertion order for
/// rows assembled by hand). Relations attached by eager loading live in a
/// separate ordered list so they never shadow a real column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
    relations: Vec<(String, Related<Row>)>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row from parallel column/value lists.
    ///
    /// Extra values beyond the column list are dropped; missing values are
    /// filled with NULL.
    #[must_use]
    pub fn from_parts(columns: Vec<String>, mut values: Vec<Value>) -> Self {
        values.resize(columns.len(), Value::Null);
        Self {
            columns,
            values,
            relations: Vec::new(),
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.values[idx])
    }

    /// Look up a value by column index.
    #[must_use]
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// True when the column is present (even if NULL).
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Set a column, replacing in place or appending at the end.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.position(&column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.position(column)?;
        self.columns.remove(idx);
        Some(self.values.remove(idx))
    }

    /// Keep only the columns accepted by `keep`, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut values = Vec::with_capacity(self.values.len());
        for (column, value) in self.columns.drain(..).zip(self.values.drain(..)) {
            if keep(&column) {
                columns.push(column);
                values.push(value);
            }
        }
        self.columns = columns;
        self.values = values;
    }

    /// Iterate `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Attach (or replace) a loaded relation.
    pub fn set_relation(&mut self, name: impl Into<String>, related: Related<Row>) {
        let name = name.into();
        if let Some(slot) = self.relations.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = related;
        } else {
            self.relations.push((name, related));
        }
    }

    /// A relation attached by eager loading.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Related<Row>> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// All attached relations in attachment order.
    #[must_use]
    pub fn relations(&self) -> &[(String, Related<Row>)] {
        &self.relations
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + self.relations.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        for (name, related) in &self.relations {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}

/// Build a [`Row`] from `column => value` pairs.
///
/// ```
/// use miniorm_core::{attrs, Value};
///
/// let row = attrs! { "name" => "Ali", "age" => 30 };
/// assert_eq!(row.get("age"), Some(&Value::BigInt(30)));
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::Row::new() };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $( row.set($column, $crate::Value::from($value)); )+
        row
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place_and_keeps_order() {
        let mut row = attrs! { "id" => 1, "name" => "Ali" };
        row.set("id", 2);
        row.set("email", "ali@example.com");
        assert_eq!(row.columns(), &["id", "name", "email"]);
        assert_eq!(row.get("id"), Some(&Value::BigInt(2)));
    }

    #[test]
    fn test_retain_filters_columns() {
        let mut row = attrs! { "id" => 1, "name" => "Ali", "role" => "admin" };
        row.retain(|c| c != "role");
        assert_eq!(row.columns(), &["id", "name"]);
        assert!(!row.contains("role"));
    }

    #[test]
    fn test_from_parts_pads_missing_values() {
        let row = Row::from_parts(vec!["a".into(), "b".into()], vec![Value::BigInt(1)]);
        assert_eq!(row.get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_serialize_includes_relations() {
        let mut post = attrs! { "id" => 10, "user_id" => 1 };
        post.set_relation("user", Related::Single(attrs! { "id" => 1 }));
        post.set_relation("editor", Related::NotFound);
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["user"]["id"], 1);
        assert!(json["editor"].is_null());
    }
}
