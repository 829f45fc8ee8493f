//! Lazily populated table/column catalog.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use miniorm_core::{Binding, Connection, Error, QueryErrorKind, Result, Value};

/// Cache of table and column names read from the engine's catalog.
///
/// The table set is loaded on the first [`has_table`](Self::has_table) call and
/// each table's column set on the first [`has_column`](Self::has_column) call
/// for that table. Entries are never invalidated; a schema change made while
/// the cache is alive is not observed.
///
/// Two threads missing the same entry at once both query the catalog and
/// store the same answer. Locks are only held while reading or storing, never
/// across a catalog query.
#[derive(Debug)]
pub struct SchemaCache {
    database: String,
    tables: RwLock<Option<HashSet<String>>>,
    columns: RwLock<HashMap<String, HashSet<String>>>,
}

impl SchemaCache {
    /// Create an empty cache for the named database (`"main"` for SQLite).
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            tables: RwLock::new(None),
            columns: RwLock::new(HashMap::new()),
        }
    }

    /// The database whose catalog is cached.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// True if `table` exists.
    pub fn has_table<C: Connection + ?Sized>(&self, conn: &C, table: &str) -> Result<bool> {
        {
            let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(tables) = tables.as_ref() {
                return Ok(tables.contains(table));
            }
        }

        let loaded = self.load_tables(conn)?;
        let found = loaded.contains(table);
        *self.tables.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded);
        Ok(found)
    }

    /// True if `table` exists and has `column`. Unknown tables yield `false`.
    pub fn has_column<C: Connection + ?Sized>(
        &self,
        conn: &C,
        table: &str,
        column: &str,
    ) -> Result<bool> {
        {
            let columns = self.columns.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cols) = columns.get(table) {
                return Ok(cols.contains(column));
            }
        }

        let loaded = self.load_columns(conn, table)?;
        let found = loaded.contains(column);
        self.columns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), loaded);
        Ok(found)
    }

    /// True once the table set has been loaded.
    #[must_use]
    pub fn tables_loaded(&self) -> bool {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of tables whose column sets are cached.
    #[must_use]
    pub fn cached_column_sets(&self) -> usize {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn load_tables<C: Connection + ?Sized>(&self, conn: &C) -> Result<HashSet<String>> {
        let sql = conn.dialect().tables_sql();
        let bindings: Vec<Binding> = vec![(":db".to_string(), Value::Text(self.database.clone()))];
        let names = self.load_names(conn, sql, &bindings)?;
        tracing::debug!(
            database = %self.database,
            tables = names.len(),
            "Loaded table catalog"
        );
        Ok(names)
    }

    fn load_columns<C: Connection + ?Sized>(
        &self,
        conn: &C,
        table: &str,
    ) -> Result<HashSet<String>> {
        let sql = conn.dialect().columns_sql();
        let bindings: Vec<Binding> = vec![
            (":db".to_string(), Value::Text(self.database.clone())),
            (":table".to_string(), Value::Text(table.to_string())),
        ];
        let names = self.load_names(conn, sql, &bindings)?;
        tracing::debug!(
            database = %self.database,
            table = table,
            columns = names.len(),
            "Loaded column catalog"
        );
        Ok(names)
    }

    fn load_names<C: Connection + ?Sized>(
        &self,
        conn: &C,
        sql: &str,
        bindings: &[Binding],
    ) -> Result<HashSet<String>> {
        let rows = conn.query(sql, bindings).map_err(|e| {
            tracing::error!(
                sql = sql,
                bindings = ?bindings,
                error = %e,
                "Schema catalog query failed"
            );
            Error::query(QueryErrorKind::Execution, "Schema catalog lookup failed.")
        })?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get_index(0))
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect())
    }
}
