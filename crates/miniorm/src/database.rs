//! The shared database context.
//!
//! A [`Database`] owns everything the ORM shares across calls: the lazily
//! opened connection, the schema cache and the N+1 tracker. Construct one per
//! database and pass it by reference; there is no global state.
//!
//! N+1 detection is off by default. Open an [`N1Scope`] around a unit of work
//! (a request, a job) to count the per-record relation loads made inside it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use miniorm_core::{Connection, ConnectionError, Error, Model, Result};
use miniorm_query::{QueryBuilder, RelationLoader};
use miniorm_schema::SchemaCache;

use crate::n1_detection::{N1QueryTracker, N1Stats};

type Connector<C> = Box<dyn Fn() -> Result<C> + Send + Sync>;

/// Shared connection, schema cache and N+1 tracker.
///
/// The connection is opened on first use and reused afterwards. If opening
/// fails, the engine's message is logged and a generic
/// [`Error::Connection`] is returned; the next call tries again.
pub struct Database<C: Connection> {
    connector: Connector<C>,
    conn: RwLock<Option<Arc<C>>>,
    schema: Arc<SchemaCache>,
    n1: Mutex<N1QueryTracker>,
}

impl<C: Connection + 'static> Database<C> {
    /// Create a context that opens its connection with `connector` on first
    /// use. `database` names the catalog the schema cache reads.
    pub fn new<F>(database: impl Into<String>, connector: F) -> Self
    where
        F: Fn() -> Result<C> + Send + Sync + 'static,
    {
        Self {
            connector: Box::new(connector),
            conn: RwLock::new(None),
            schema: Arc::new(SchemaCache::new(database)),
            n1: Mutex::new(N1QueryTracker::disabled()),
        }
    }

    /// Create a context around an already open connection.
    pub fn with_connection(database: impl Into<String>, conn: C) -> Self {
        let db = Self::new(database, || {
            Err(Error::Config(
                "no connector configured for this database".to_string(),
            ))
        });
        db.set_connection(conn);
        db
    }

    /// The shared connection, opening it if needed.
    pub fn connection(&self) -> Result<Arc<C>> {
        if let Some(conn) = self.conn.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(conn));
        }

        let mut slot = self.conn.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = slot.as_ref() {
            return Ok(Arc::clone(conn));
        }
        let conn = (self.connector)().map_err(|e| {
            tracing::error!(
                database = %self.schema.database(),
                error = %e,
                "Database connection failed"
            );
            Error::Connection(ConnectionError {
                message: "Database connection failed.".to_string(),
            })
        })?;
        let conn = Arc::new(conn);
        *slot = Some(Arc::clone(&conn));
        tracing::debug!(database = %self.schema.database(), "Database connection established");
        Ok(conn)
    }

    /// Replace the shared connection (tests inject a prepared database here).
    /// The schema cache is kept.
    pub fn set_connection(&self, conn: C) {
        *self.conn.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(conn));
    }

    /// True once a connection is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.conn
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The schema cache shared by every builder from this context.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    /// An empty query builder.
    pub fn query(&self) -> Result<QueryBuilder<C>> {
        Ok(QueryBuilder::new(self.connection()?, Arc::clone(&self.schema)))
    }

    /// A query builder over `table`.
    pub fn table(&self, table: &str) -> Result<QueryBuilder<C>> {
        self.query()?.table(table)
    }

    /// A query builder bound to model `M`.
    pub fn model<M: Model>(&self) -> Result<QueryBuilder<C>> {
        self.query()?.for_model::<M>()
    }

    /// A relation loader over the shared connection.
    pub fn relations(&self) -> Result<RelationLoader<C>> {
        Ok(RelationLoader::new(self.connection()?, Arc::clone(&self.schema)))
    }

    /// Count per-record relation loads until the returned guard is dropped.
    ///
    /// Opening a scope clears earlier counts and enables the tracker; dropping
    /// it logs a summary, clears the counts and restores the previous enabled
    /// state. Scopes do not nest.
    pub fn n1_scope(&self) -> N1Scope<'_, C> {
        let mut tracker = self.n1_tracker();
        let was_enabled = tracker.is_enabled();
        tracker.reset();
        tracker.enable();
        N1Scope {
            db: self,
            was_enabled,
        }
    }

    /// Lock the N+1 tracker (to adjust the threshold, enable or reset it).
    pub fn n1_tracker(&self) -> MutexGuard<'_, N1QueryTracker> {
        self.n1.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current N+1 counters.
    #[must_use]
    pub fn n1_stats(&self) -> N1Stats {
        self.n1_tracker().stats()
    }

    #[track_caller]
    pub(crate) fn record_relation_load(&self, model: &'static str, relation: &'static str) {
        self.n1_tracker().record_load(model, relation);
    }
}

#[cfg(feature = "sqlite")]
impl Database<miniorm_sqlite::SqliteConnection> {
    /// A SQLite context for `config`; `config.database` is the file path.
    pub fn sqlite(config: crate::config::DatabaseConfig) -> Self {
        tracing::debug!(dsn = %config.dsn(), "Configuring SQLite database");
        Self::new("main", move || {
            miniorm_sqlite::SqliteConnection::open(&config.database)
        })
    }

    /// A SQLite context configured from `DB_*` environment variables.
    pub fn sqlite_from_env() -> Self {
        Self::sqlite(crate::config::DatabaseConfig::from_env())
    }
}

/// Guard returned by [`Database::n1_scope`].
pub struct N1Scope<'db, C: Connection + 'static> {
    db: &'db Database<C>,
    was_enabled: bool,
}

impl<C: Connection + 'static> N1Scope<'_, C> {
    /// Counters of the loads made since the scope was opened.
    #[must_use]
    pub fn stats(&self) -> N1Stats {
        self.db.n1_stats()
    }
}

impl<C: Connection + 'static> Drop for N1Scope<'_, C> {
    fn drop(&mut self) {
        let mut tracker = self.db.n1_tracker();
        let stats = tracker.stats();
        if stats.total_loads > 0 {
            tracing::debug!(
                target: "miniorm::n1",
                total_loads = stats.total_loads,
                relations_loaded = stats.relations_loaded,
                potential_n1 = stats.potential_n1,
                "N+1 scope closed"
            );
        }
        tracker.reset();
        if !self.was_enabled {
            tracker.disable();
        }
    }
}

impl<C: Connection> fmt::Debug for Database<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("database", &self.schema.database())
            .field(
                "connected",
                &self
                    .conn
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some(),
            )
            .finish_non_exhaustive()
    }
}
