//! Shared fixtures: an in-memory SQLite database behind a statement-recording
//! connection, and the blog models used across the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

use miniorm::prelude::*;
use miniorm::{Binding, Dialect};

pub const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT,
        email TEXT UNIQUE,
        status TEXT,
        age INTEGER,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT,
        content TEXT,
        user_id INTEGER,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER,
        bio TEXT,
        avatar TEXT
    );
    CREATE TABLE roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT
    );
    CREATE TABLE role_user (
        user_id INTEGER,
        role_id INTEGER
    );
";

model! {
    /// A registered user.
    pub struct User {
        table: "users",
        fillable: ["name", "email", "status", "age"],
        relationships: [
            RelationshipInfo::has_many("posts", "posts", "user_id", "id"),
            RelationshipInfo::has_one("profile", "profiles", "user_id", "id"),
            RelationshipInfo::belongs_to_many(
                "roles",
                "roles",
                PivotTable::new("role_user", "user_id", "role_id"),
                "id",
                "id",
            ),
        ],
    }
}

model! {
    /// A blog post.
    pub struct Post {
        table: "posts",
        fillable: ["title", "content", "user_id"],
        relationships: [
            RelationshipInfo::belongs_to("user", "users", "user_id", "id"),
        ],
    }
}

model! {
    /// Extra details for a user.
    pub struct Profile {
        table: "profiles",
        fillable: ["user_id", "bio", "avatar"],
        relationships: [
            RelationshipInfo::belongs_to("user", "users", "user_id", "id"),
        ],
    }
}

model! {
    pub struct Role {
        table: "roles",
        fillable: ["name"],
    }
}

pub const ROLE_USER: PivotTable = PivotTable::new("role_user", "user_id", "role_id");

/// Wraps the SQLite driver and records every statement it is asked to run.
pub struct SpyConnection {
    inner: SqliteConnection,
    log: Arc<Mutex<Vec<String>>>,
}

impl SpyConnection {
    fn record(&self, sql: &str) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
    }
}

impl Connection for SpyConnection {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn query(&self, sql: &str, bindings: &[Binding]) -> Result<Vec<Row>> {
        self.record(sql);
        self.inner.query(sql, bindings)
    }

    fn execute(&self, sql: &str, bindings: &[Binding]) -> Result<u64> {
        self.record(sql);
        self.inner.execute(sql, bindings)
    }

    fn insert(&self, sql: &str, bindings: &[Binding]) -> Result<i64> {
        self.record(sql);
        self.inner.insert(sql, bindings)
    }
}

/// A database context over a fresh in-memory schema.
pub struct Fixture {
    pub db: Database<SpyConnection>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Fixture {
    /// Empty tables.
    pub fn new() -> Self {
        Self::with_sql("")
    }

    /// Tables plus the given fixture statements.
    pub fn with_sql(seed: &str) -> Self {
        let inner = SqliteConnection::open_memory().expect("open sqlite memory db");
        inner.execute_batch(SCHEMA).expect("create schema");
        if !seed.is_empty() {
            inner.execute_batch(seed).expect("seed fixture data");
        }
        let log = Arc::new(Mutex::new(Vec::new()));
        let conn = SpyConnection {
            inner,
            log: Arc::clone(&log),
        };
        Self {
            db: Database::with_connection("main", conn),
            log,
        }
    }

    /// Number of statements recorded so far; pass to [`since`](Self::since).
    pub fn mark(&self) -> usize {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Statements recorded after `mark`.
    pub fn since(&self, mark: usize) -> Vec<String> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)[mark..].to_vec()
    }

    /// Statements recorded after `mark`, without schema catalog lookups.
    pub fn data_since(&self, mark: usize) -> Vec<String> {
        self.since(mark)
            .into_iter()
            .filter(|sql| !sql.contains("pragma_table"))
            .collect()
    }
}

pub fn text<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}
