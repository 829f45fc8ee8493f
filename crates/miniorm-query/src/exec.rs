//! Statement execution with failure logging.
//!
//! Engine errors never reach callers verbatim. The failing statement, its
//! bindings and the engine message are logged; callers get a generic
//! [`Error::Query`] carrying only the message passed here.

use miniorm_core::{Binding, Connection, Error, QueryErrorKind, Result, Row};

/// Run a row-returning statement.
pub(crate) fn fetch<C: Connection + ?Sized>(
    conn: &C,
    sql: &str,
    bindings: &[Binding],
    kind: QueryErrorKind,
    message: &'static str,
) -> Result<Vec<Row>> {
    tracing::debug!(sql = sql, bindings = bindings.len(), "query");
    conn.query(sql, bindings)
        .map_err(|e| failure(e, sql, bindings, kind, message))
}

/// Run a statement and return the affected row count.
pub(crate) fn execute<C: Connection + ?Sized>(
    conn: &C,
    sql: &str,
    bindings: &[Binding],
    kind: QueryErrorKind,
    message: &'static str,
) -> Result<u64> {
    tracing::debug!(sql = sql, bindings = bindings.len(), "execute");
    conn.execute(sql, bindings)
        .map_err(|e| failure(e, sql, bindings, kind, message))
}

/// Run an INSERT and return the new row id.
pub(crate) fn insert<C: Connection + ?Sized>(
    conn: &C,
    sql: &str,
    bindings: &[Binding],
    kind: QueryErrorKind,
    message: &'static str,
) -> Result<i64> {
    tracing::debug!(sql = sql, bindings = bindings.len(), "insert");
    conn.insert(sql, bindings)
        .map_err(|e| failure(e, sql, bindings, kind, message))
}

fn failure(
    err: Error,
    sql: &str,
    bindings: &[Binding],
    kind: QueryErrorKind,
    message: &'static str,
) -> Error {
    tracing::error!(
        sql = sql,
        bindings = ?bindings,
        error = %err,
        "{message}"
    );
    match err {
        // Caller mistakes surfaced by the driver (e.g. an array bound to a
        // scalar placeholder) stay distinguishable.
        Error::InvalidArgument(_) => err,
        _ => Error::query(kind, message),
    }
}
