//! The engine boundary.
//!
//! Drivers implement [`Connection`]. Everything above it works with SQL text
//! using named placeholders (`:name`) plus a list of [`Binding`]s whose names
//! match those placeholders one to one.

use std::sync::Arc;

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// A named parameter: `(":placeholder", value)`.
pub type Binding = (String, Value);

/// SQL dialect spoken by a connection.
///
/// Only the catalog lookups differ between dialects; the statements built by
/// the query layer are plain SQL with named parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// SQLite.
    #[default]
    Sqlite,
    /// MySQL / MariaDB.
    MySql,
}

impl Dialect {
    /// Catalog query listing the tables of a database. Binds `:db`.
    #[must_use]
    pub const fn tables_sql(self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "SELECT name FROM pragma_table_list WHERE schema = :db AND type = 'table' AND name NOT LIKE 'sqlite_%'"
            }
            Dialect::MySql => {
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = :db"
            }
        }
    }

    /// Catalog query listing the columns of one table. Binds `:db` and `:table`.
    #[must_use]
    pub const fn columns_sql(self) -> &'static str {
        match self {
            Dialect::Sqlite => "SELECT name FROM pragma_table_info(:table, :db)",
            Dialect::MySql => {
                "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = :db AND TABLE_NAME = :table"
            }
        }
    }
}

/// A synchronous connection to the relational engine.
///
/// Implementations report failures as [`Error::Engine`](crate::Error::Engine);
/// the query layer logs and converts them.
pub trait Connection: Send + Sync {
    /// The dialect used for catalog lookups.
    fn dialect(&self) -> Dialect;

    /// Run a statement that returns rows.
    fn query(&self, sql: &str, bindings: &[Binding]) -> Result<Vec<Row>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, bindings: &[Binding]) -> Result<u64>;

    /// Run an INSERT and return the last inserted row id.
    fn insert(&self, sql: &str, bindings: &[Binding]) -> Result<i64>;
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, sql: &str, bindings: &[Binding]) -> Result<Vec<Row>> {
        (**self).query(sql, bindings)
    }

    fn execute(&self, sql: &str, bindings: &[Binding]) -> Result<u64> {
        (**self).execute(sql, bindings)
    }

    fn insert(&self, sql: &str, bindings: &[Binding]) -> Result<i64> {
        (**self).insert(sql, bindings)
    }
}

impl<C: Connection + ?Sized> Connection for &C {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn query(&self, sql: &str, bindings: &[Binding]) -> Result<Vec<Row>> {
        (**self).query(sql, bindings)
    }

    fn execute(&self, sql: &str, bindings: &[Binding]) -> Result<u64> {
        (**self).execute(sql, bindings)
    }

    fn insert(&self, sql: &str, bindings: &[Binding]) -> Result<i64> {
        (**self).insert(sql, bindings)
    }
}
