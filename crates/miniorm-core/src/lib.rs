//! Core types and traits for miniorm.
//!
//! `miniorm-core` is the foundation layer of the workspace. It defines the
//! contracts every other crate builds on and has no knowledge of SQL
//! construction or of any particular engine.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: [`Model`] is implemented by record types (usually via
//!   [`model!`]) and [`Connection`] by engine drivers.
//! - **Data model**: [`Row`] and [`Value`] carry query inputs and outputs;
//!   [`Related`] is the one result shape for every relation.
//! - **Safety**: [`identifiers`] holds the checks every structural name must
//!   pass before it is placed into SQL text.
//!
//! # Who Uses This Crate
//!
//! - `miniorm-schema` queries catalogs through [`Connection`].
//! - `miniorm-query` validates with [`identifiers`] and reads [`ModelMeta`].
//! - `miniorm-sqlite` implements [`Connection`] over rusqlite.
//! - `miniorm` re-exports everything behind its prelude.

pub mod connection;
pub mod error;
pub mod identifiers;
pub mod model;
pub mod relationship;
pub mod row;
pub mod value;

pub use connection::{Binding, Connection, Dialect};
pub use error::{
    ConnectionError, EngineError, Error, QueryError, QueryErrorKind, Result,
};
pub use identifiers::{ensure_identifier, is_safe_identifier, is_safe_qualified_name};
pub use model::{Model, ModelMeta};
pub use relationship::{
    PivotTable, Related, RelationshipInfo, RelationshipKind, default_foreign_key,
    find_relationship,
};
pub use row::Row;
pub use value::{RelationKey, Value};
