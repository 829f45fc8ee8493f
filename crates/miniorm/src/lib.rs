//! miniorm: declarative models, validated parameterized queries and
//! batched relation loading.
//!
//! This facade crate ties the workspace together:
//!
//! - [`Database`] holds the shared connection, schema cache and N+1 tracker.
//! - [`ModelExt`] adds CRUD and relation traversal to every [`Model`].
//! - [`QueryBuilder`] (from `miniorm-query`) builds SELECTs whose every name
//!   is validated against the live schema and whose every value is bound.
//!
//! # Example
//!
//! ```ignore
//! use miniorm::prelude::*;
//!
//! model! {
//!     pub struct Post {
//!         table: "posts",
//!         fillable: ["title", "content", "user_id"],
//!         relationships: [
//!             RelationshipInfo::belongs_to("user", "users", "user_id", "id"),
//!         ],
//!     }
//! }
//!
//! let db = Database::sqlite(DatabaseConfig::from_env());
//! let post = Post::create(&db, &attrs! { "title" => "Hello", "user_id" => 1 })?;
//!
//! // One query for the posts, one for all of their authors.
//! let posts = Post::with(&db, ["user"])?
//!     .filter("title", "LIKE", "H%")?
//!     .order_by("id", "DESC")?
//!     .get_models::<Post>()?;
//! ```

pub mod config;
pub mod database;
pub mod model_ext;
pub mod n1_detection;

pub use config::DatabaseConfig;
pub use database::{Database, N1Scope};
pub use model_ext::ModelExt;
pub use n1_detection::{N1QueryTracker, N1Stats};

pub use miniorm_core::{
    Binding, Connection, ConnectionError, Dialect, Error, Model, ModelMeta, PivotTable,
    QueryError, QueryErrorKind, Related, RelationKey, RelationshipInfo, RelationshipKind, Result,
    Row, Value, attrs, default_foreign_key, is_safe_identifier, is_safe_qualified_name, model,
};
pub use miniorm_query::{
    DeleteBuilder, InsertBuilder, Operator, Order, QueryBuilder, RelationLoader, UpdateBuilder,
};
pub use miniorm_schema::SchemaCache;

#[cfg(feature = "sqlite")]
pub use miniorm_sqlite::SqliteConnection;

/// Everything needed to declare models and run queries.
pub mod prelude {
    pub use crate::{
        Connection, Database, DatabaseConfig, Error, Model, ModelExt, PivotTable, QueryBuilder,
        Related, RelationKey, RelationshipInfo, Result, Row, Value, attrs, model,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::SqliteConnection;
}
