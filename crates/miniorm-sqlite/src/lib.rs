//! SQLite driver for miniorm, built on rusqlite.
//!
//! [`SqliteConnection`] implements [`miniorm_core::Connection`] with named
//! parameters. Catalog lookups for the schema cache go through
//! `pragma_table_list` and `pragma_table_info`, so the cache's database name
//! is the SQLite schema name (`"main"`).

pub mod connection;
pub mod types;

pub use connection::{MEMORY, SqliteConnection};
