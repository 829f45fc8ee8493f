//! Relation resolution, one parent at a time or batched over many.

use std::collections::HashMap;
use std::sync::Arc;

use miniorm_core::{
    Connection, Error, QueryErrorKind, Related, RelationKey, RelationshipInfo, RelationshipKind,
    Result, Row, Value, ensure_identifier,
};
use miniorm_schema::SchemaCache;

use crate::exec;
use crate::select::QueryBuilder;

/// Alias under which the pivot's foreign key is selected for many-to-many
/// batches. Removed from each row before it is returned.
const PIVOT_KEY_ALIAS: &str = "__miniorm_pivot_key";

/// Loads related rows for declared relationships.
pub struct RelationLoader<C: Connection + ?Sized> {
    conn: Arc<C>,
    schema: Arc<SchemaCache>,
}

impl<C: Connection + ?Sized> RelationLoader<C> {
    /// Create a loader over a connection and its schema cache.
    pub fn new(conn: Arc<C>, schema: Arc<SchemaCache>) -> Self {
        Self { conn, schema }
    }

    /// Resolve one relation for one parent row.
    ///
    /// A parent without a usable value in the relation's local key column
    /// yields the empty result for the relation kind and a warning; no query
    /// is issued.
    pub fn load(&self, model: &str, info: &RelationshipInfo, parent: &Row) -> Result<Related<Row>> {
        let Some(key) = parent.get(info.local_key).and_then(Value::relation_key) else {
            tracing::warn!(
                model = model,
                relation = info.name,
                key = info.local_key,
                "Relation key missing on record; returning empty result"
            );
            return Ok(Related::empty(info.kind));
        };

        let mut grouped = self.load_batch(info, std::slice::from_ref(&key))?;
        let rows = grouped.remove(&key).unwrap_or_default();
        Ok(collect(info.kind, rows))
    }

    /// Resolve one relation for many parents in a single statement.
    ///
    /// `keys` are values of the relation's local key column. The result maps
    /// each key to the related rows matched for it, in engine order; keys
    /// with no match are absent.
    pub fn load_batch(
        &self,
        info: &RelationshipInfo,
        keys: &[RelationKey],
    ) -> Result<HashMap<RelationKey, Vec<Row>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        match info.kind {
            RelationshipKind::BelongsTo | RelationshipKind::HasOne | RelationshipKind::HasMany => {
                self.rows_by_key(info.related_table, info.remote_key, keys)
            }
            RelationshipKind::BelongsToMany => self.through_pivot(info, keys),
        }
    }

    /// Owner rows of `related_table` keyed by `owner_key`, one per key.
    ///
    /// This is the batch form of a belongs-to lookup: the caller collects
    /// foreign key values from many children and gets back a map to attach
    /// owners from.
    pub fn belongs_to_batch(
        &self,
        related_table: &str,
        owner_key: &str,
        keys: &[RelationKey],
    ) -> Result<HashMap<RelationKey, Row>> {
        Ok(self
            .rows_by_key(related_table, owner_key, keys)?
            .into_iter()
            .filter_map(|(key, rows)| rows.into_iter().next().map(|row| (key, row)))
            .collect())
    }

    /// Rows of `table` whose `column` holds one of `keys`, grouped by that
    /// column's value. One statement; `=` for a single key, `IN` otherwise.
    pub fn rows_by_key(
        &self,
        table: &str,
        column: &str,
        keys: &[RelationKey],
    ) -> Result<HashMap<RelationKey, Vec<Row>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let builder = QueryBuilder::new(Arc::clone(&self.conn), Arc::clone(&self.schema)).table(table)?;
        let builder = match keys {
            [single] => builder.filter(column, "=", single.clone())?,
            _ => builder.filter(column, "IN", key_values(keys))?,
        };
        Ok(group_by(builder.get()?, column))
    }

    fn through_pivot(
        &self,
        info: &RelationshipInfo,
        keys: &[RelationKey],
    ) -> Result<HashMap<RelationKey, Vec<Row>>> {
        let pivot = info.pivot.ok_or_else(|| {
            Error::invalid_argument(format!(
                "Relation {} is many-to-many but declares no pivot table",
                info.name
            ))
        })?;
        let related = info.related_table;

        ensure_identifier("table", related)?;
        ensure_identifier("table", pivot.table_name)?;
        ensure_identifier("column", pivot.foreign_pivot_key)?;
        ensure_identifier("column", pivot.related_pivot_key)?;
        ensure_identifier("column", info.remote_key)?;
        for table in [related, pivot.table_name] {
            if !self.schema.has_table(&*self.conn, table)? {
                return Err(Error::invalid_argument(format!("Table not found: {table}")));
            }
        }
        for (table, column) in [
            (pivot.table_name, pivot.foreign_pivot_key),
            (pivot.table_name, pivot.related_pivot_key),
            (related, info.remote_key),
        ] {
            if !self.schema.has_column(&*self.conn, table, column)? {
                return Err(Error::invalid_argument(format!(
                    "Column not found: {table}.{column}"
                )));
            }
        }

        let mut placeholders = Vec::with_capacity(keys.len());
        let mut bindings = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let name = format!(":p0_{}_{i}", pivot.foreign_pivot_key);
            placeholders.push(name.clone());
            bindings.push((name, Value::from(key.clone())));
        }
        let sql = format!(
            "SELECT {related}.*, {p}.{fk} AS {PIVOT_KEY_ALIAS} FROM {related} \
             INNER JOIN {p} ON {p}.{rk} = {related}.{remote} \
             WHERE {p}.{fk} IN ({})",
            placeholders.join(", "),
            p = pivot.table_name,
            fk = pivot.foreign_pivot_key,
            rk = pivot.related_pivot_key,
            remote = info.remote_key,
        );

        let rows = exec::fetch(
            &*self.conn,
            &sql,
            &bindings,
            QueryErrorKind::Execution,
            "Database query failed.",
        )?;

        let mut grouped: HashMap<RelationKey, Vec<Row>> = HashMap::new();
        for mut row in rows {
            let key = row.remove(PIVOT_KEY_ALIAS).and_then(|v| v.relation_key());
            if let Some(key) = key {
                grouped.entry(key).or_default().push(row);
            }
        }
        Ok(grouped)
    }
}

/// Shape rows into the result for a relationship kind.
pub fn collect(kind: RelationshipKind, rows: Vec<Row>) -> Related<Row> {
    if kind.is_many() {
        Related::Many(rows)
    } else {
        rows.into_iter()
            .next()
            .map_or(Related::NotFound, Related::Single)
    }
}

fn key_values(keys: &[RelationKey]) -> Value {
    Value::Array(keys.iter().cloned().map(Value::from).collect())
}

fn group_by(rows: Vec<Row>, column: &str) -> HashMap<RelationKey, Vec<Row>> {
    let mut grouped: HashMap<RelationKey, Vec<Row>> = HashMap::new();
    for row in rows {
        if let Some(key) = row.get(column).and_then(Value::relation_key) {
            grouped.entry(key).or_default().push(row);
        }
    }
    grouped
}
