//! A `Connection` over one rusqlite handle.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use miniorm_core::{Binding, Connection, Dialect, Error, Result, Row};
use rusqlite::ToSql;
use rusqlite::types::Value as SqliteValue;

use crate::types::{from_sqlite, to_sqlite};

/// Path that opens a private in-memory database.
pub const MEMORY: &str = ":memory:";

/// A SQLite database handle.
///
/// The rusqlite handle is not `Sync`, so calls are serialized through a
/// mutex; one `SqliteConnection` runs one statement at a time.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open (creating if needed) the database file at `path`. `":memory:"`
    /// opens an in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = if path == Path::new(MEMORY) {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(|e| Error::engine(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self::from_rusqlite(conn))
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(MEMORY)
    }

    /// Wrap an existing rusqlite handle.
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run a batch of unparameterized statements (schema setup, fixtures).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.lock()
            .execute_batch(sql)
            .map_err(|e| Error::engine(e.to_string()))
    }

    fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, sql: &str, bindings: &[Binding]) -> Result<usize> {
        let values = convert(bindings)?;
        let params = as_params(&values);
        let conn = self.lock();
        let mut stmt = conn.prepare(sql).map_err(engine)?;
        stmt.execute(params.as_slice()).map_err(engine)
    }
}

impl Connection for SqliteConnection {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn query(&self, sql: &str, bindings: &[Binding]) -> Result<Vec<Row>> {
        let values = convert(bindings)?;
        let params = as_params(&values);

        let conn = self.lock();
        let mut stmt = conn.prepare(sql).map_err(engine)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt.query(params.as_slice()).map_err(engine)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(engine)? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(from_sqlite(row.get_ref(idx).map_err(engine)?));
            }
            out.push(Row::from_parts(columns.clone(), values));
        }
        Ok(out)
    }

    fn execute(&self, sql: &str, bindings: &[Binding]) -> Result<u64> {
        let changed = self.run(sql, bindings)?;
        Ok(u64::try_from(changed).unwrap_or(u64::MAX))
    }

    fn insert(&self, sql: &str, bindings: &[Binding]) -> Result<i64> {
        let values = convert(bindings)?;
        let params = as_params(&values);
        let conn = self.lock();
        let mut stmt = conn.prepare(sql).map_err(engine)?;
        stmt.execute(params.as_slice()).map_err(engine)?;
        Ok(conn.last_insert_rowid())
    }
}

fn engine(err: rusqlite::Error) -> Error {
    Error::engine(err.to_string())
}

fn convert(bindings: &[Binding]) -> Result<Vec<(&str, SqliteValue)>> {
    bindings
        .iter()
        .map(|(name, value)| Ok((name.as_str(), to_sqlite(name, value)?)))
        .collect()
}

fn as_params<'a>(values: &'a [(&'a str, SqliteValue)]) -> Vec<(&'a str, &'a dyn ToSql)> {
    values
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}
