//! Builders for INSERT, UPDATE and DELETE by primary key.
//!
//! Each builder validates every table and column name (safe identifier and
//! present in the schema) before any SQL text is produced. Values are bound
//! by name.

use miniorm_core::{
    Binding, Connection, Dialect, Error, QueryErrorKind, Result, Row, Value, ensure_identifier,
};
use miniorm_schema::SchemaCache;

use crate::exec;

/// INSERT of one row.
///
/// ```ignore
/// let id = InsertBuilder::new("users", &attrs! { "name" => "Ali" })
///     .execute(&*conn, &schema)?;
/// ```
#[derive(Debug)]
pub struct InsertBuilder<'a> {
    table: &'a str,
    values: &'a Row,
}

impl<'a> InsertBuilder<'a> {
    /// Insert `values` into `table`.
    pub fn new(table: &'a str, values: &'a Row) -> Self {
        Self { table, values }
    }

    /// Build the statement. An empty row inserts all defaults.
    pub fn build<C: Connection + ?Sized>(
        &self,
        conn: &C,
        schema: &SchemaCache,
    ) -> Result<(String, Vec<Binding>)> {
        check_table(conn, schema, self.table)?;
        for column in self.values.columns() {
            check_column(conn, schema, self.table, column)?;
        }

        if self.values.is_empty() {
            let sql = match conn.dialect() {
                Dialect::Sqlite => format!("INSERT INTO {} DEFAULT VALUES", self.table),
                Dialect::MySql => format!("INSERT INTO {} () VALUES ()", self.table),
            };
            return Ok((sql, Vec::new()));
        }

        let columns = self.values.columns();
        let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
        let bindings: Vec<Binding> = placeholders
            .iter()
            .cloned()
            .zip(self.values.values().iter().cloned())
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, bindings))
    }

    /// Execute the INSERT and return the new row id.
    pub fn execute<C: Connection + ?Sized>(&self, conn: &C, schema: &SchemaCache) -> Result<i64> {
        let (sql, bindings) = self.build(conn, schema)?;
        exec::insert(conn, &sql, &bindings, QueryErrorKind::Write, "Insert failed.")
    }
}

/// UPDATE of the row whose key column equals a value.
#[derive(Debug)]
pub struct UpdateBuilder<'a> {
    table: &'a str,
    key_column: &'a str,
    key: Value,
    sets: Row,
}

impl<'a> UpdateBuilder<'a> {
    /// Update the row of `table` where `key_column = key`.
    pub fn new(table: &'a str, key_column: &'a str, key: impl Into<Value>) -> Self {
        Self {
            table,
            key_column,
            key: key.into(),
            sets: Row::new(),
        }
    }

    /// Add a column assignment.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.sets.set(column, value);
        self
    }

    /// Add every column of `row`.
    pub fn set_all(mut self, row: &Row) -> Self {
        for (column, value) in row.iter() {
            self.sets.set(column, value.clone());
        }
        self
    }

    /// True when no assignment has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Build the statement. At least one assignment is required.
    pub fn build<C: Connection + ?Sized>(
        &self,
        conn: &C,
        schema: &SchemaCache,
    ) -> Result<(String, Vec<Binding>)> {
        if self.sets.is_empty() {
            return Err(Error::invalid_argument(
                "UPDATE requires at least one column to set",
            ));
        }
        check_table(conn, schema, self.table)?;
        check_column(conn, schema, self.table, self.key_column)?;

        let mut assignments = Vec::with_capacity(self.sets.len());
        let mut bindings = Vec::with_capacity(self.sets.len() + 1);
        for (column, value) in self.sets.iter() {
            check_column(conn, schema, self.table, column)?;
            let name = format!(":set_{column}");
            assignments.push(format!("{column} = {name}"));
            bindings.push((name, value.clone()));
        }
        bindings.push((":key".to_string(), self.key.clone()));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = :key",
            self.table,
            assignments.join(", "),
            self.key_column
        );
        Ok((sql, bindings))
    }

    /// Execute the UPDATE and return the affected row count.
    pub fn execute<C: Connection + ?Sized>(&self, conn: &C, schema: &SchemaCache) -> Result<u64> {
        let (sql, bindings) = self.build(conn, schema)?;
        exec::execute(conn, &sql, &bindings, QueryErrorKind::Write, "Update failed.")
    }
}

/// DELETE of the row whose key column equals a value.
#[derive(Debug)]
pub struct DeleteBuilder<'a> {
    table: &'a str,
    key_column: &'a str,
    key: Value,
}

impl<'a> DeleteBuilder<'a> {
    /// Delete from `table` where `key_column = key`.
    pub fn new(table: &'a str, key_column: &'a str, key: impl Into<Value>) -> Self {
        Self {
            table,
            key_column,
            key: key.into(),
        }
    }

    /// Build the statement.
    pub fn build<C: Connection + ?Sized>(
        &self,
        conn: &C,
        schema: &SchemaCache,
    ) -> Result<(String, Vec<Binding>)> {
        check_table(conn, schema, self.table)?;
        check_column(conn, schema, self.table, self.key_column)?;
        let sql = format!("DELETE FROM {} WHERE {} = :key", self.table, self.key_column);
        Ok((sql, vec![(":key".to_string(), self.key.clone())]))
    }

    /// Execute the DELETE and return the affected row count.
    pub fn execute<C: Connection + ?Sized>(&self, conn: &C, schema: &SchemaCache) -> Result<u64> {
        let (sql, bindings) = self.build(conn, schema)?;
        exec::execute(conn, &sql, &bindings, QueryErrorKind::Write, "Delete failed.")
    }
}

fn check_table<C: Connection + ?Sized>(conn: &C, schema: &SchemaCache, table: &str) -> Result<()> {
    ensure_identifier("table", table)?;
    if schema.has_table(conn, table)? {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!("Table not found: {table}")))
    }
}

fn check_column<C: Connection + ?Sized>(
    conn: &C,
    schema: &SchemaCache,
    table: &str,
    column: &str,
) -> Result<()> {
    ensure_identifier("column", column)?;
    if schema.has_column(conn, table, column)? {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "Column not found: {table}.{column}"
        )))
    }
}
