//! Schema metadata for miniorm.
//!
//! The query layer never trusts a table or column name just because it is
//! syntactically safe; it also checks that the name exists. [`SchemaCache`]
//! answers those questions from the engine's catalog and remembers the
//! answers for its whole lifetime.
//!
//! The cache is an ordinary value: construct it once (the `miniorm::Database`
//! context does this) and share it with every query builder through an `Arc`.

pub mod cache;

pub use cache::SchemaCache;
