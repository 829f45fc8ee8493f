//! Validated, parameterized query building for miniorm.
//!
//! `miniorm-query` turns caller input into SQL text plus named bindings. It
//! is the only layer that writes SQL, and it never writes a structural name
//! that has not passed both the identifier check and a schema lookup, nor an
//! operator outside [`Operator::ALL`]. Values are always bound.
//!
//! - [`QueryBuilder`] builds and runs SELECTs, including `exists`, `count`
//!   and eager loading of declared relations.
//! - [`RelationLoader`] resolves relations for one parent or in batches.
//! - [`InsertBuilder`], [`UpdateBuilder`] and [`DeleteBuilder`] build the
//!   write statements used by model CRUD.
//!
//! Engine failures are logged with the statement and its bindings and
//! surface as a generic [`Error::Query`](miniorm_core::Error::Query).

mod eager;
mod exec;
pub mod operator;
pub mod relation;
pub mod select;
pub mod write;

#[cfg(test)]
mod test_support;

pub use operator::{Operator, Order};
pub use relation::RelationLoader;
pub use select::QueryBuilder;
pub use write::{DeleteBuilder, InsertBuilder, UpdateBuilder};
