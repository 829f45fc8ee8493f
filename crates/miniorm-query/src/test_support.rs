//! Seeded in-memory SQLite database that records every statement it runs.

use std::sync::{Arc, Mutex, PoisonError};

use miniorm_core::{Binding, Connection, Dialect, Result, Row};
use miniorm_schema::SchemaCache;
use miniorm_sqlite::SqliteConnection;

use crate::select::QueryBuilder;

const SEED: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        email TEXT,
        status TEXT,
        age INTEGER
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        title TEXT,
        content TEXT
    );
    CREATE TABLE profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        bio TEXT
    );
    CREATE TABLE roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT
    );
    CREATE TABLE role_user (
        user_id INTEGER,
        role_id INTEGER
    );

    INSERT INTO users (name, email, status, age) VALUES
        ('Ali', 'ali@example.com', 'active', 25),
        ('Veli', NULL, 'inactive', 40),
        ('Ayse', 'ayse@example.com', 'active', 19);
    INSERT INTO posts (user_id, title, content) VALUES
        (1, 'First', 'a'),
        (1, 'Second', 'b'),
        (2, 'Third', 'c'),
        (NULL, 'Orphan', 'd');
    INSERT INTO profiles (user_id, bio) VALUES (1, 'Rustacean');
    INSERT INTO roles (name) VALUES ('admin'), ('editor'), ('viewer');
    INSERT INTO role_user (user_id, role_id) VALUES (1, 1), (1, 2), (2, 3);
";

pub(crate) struct TestDb {
    conn: SqliteConnection,
    schema: Arc<SchemaCache>,
    statements: Mutex<Vec<String>>,
}

impl TestDb {
    pub(crate) fn seeded() -> Arc<Self> {
        let conn = SqliteConnection::open_memory().expect("open in-memory database");
        conn.execute_batch(SEED).expect("seed test database");
        Arc::new(Self {
            conn,
            schema: Arc::new(SchemaCache::new("main")),
            statements: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    pub(crate) fn builder(self: &Arc<Self>) -> QueryBuilder<TestDb> {
        QueryBuilder::new(Arc::clone(self), Arc::clone(&self.schema))
    }

    /// Every statement run so far, catalog lookups included.
    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch one row directly, bypassing the statement log.
    pub(crate) fn row(&self, sql: &str) -> Row {
        self.conn
            .query(sql, &[])
            .expect("fixture query")
            .into_iter()
            .next()
            .expect("fixture row")
    }

    fn record(&self, sql: &str) {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
    }
}

impl Connection for TestDb {
    fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    fn query(&self, sql: &str, bindings: &[Binding]) -> Result<Vec<Row>> {
        self.record(sql);
        self.conn.query(sql, bindings)
    }

    fn execute(&self, sql: &str, bindings: &[Binding]) -> Result<u64> {
        self.record(sql);
        self.conn.execute(sql, bindings)
    }

    fn insert(&self, sql: &str, bindings: &[Binding]) -> Result<i64> {
        self.record(sql);
        self.conn.insert(sql, bindings)
    }
}
