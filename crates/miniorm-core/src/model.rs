//! The `Model` trait: a record kind bound to one table.

use crate::relationship::{RelationshipInfo, find_relationship};
use crate::row::Row;
use crate::value::Value;

/// Static description of a model, usable without the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelMeta {
    /// Declared model name (e.g., `"Post"`).
    pub name: &'static str,
    /// Table name.
    pub table: &'static str,
    /// Primary key column.
    pub primary_key: &'static str,
    /// Declared relationships.
    pub relationships: &'static [RelationshipInfo],
}

impl ModelMeta {
    /// Find a declared relationship by name.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&'static RelationshipInfo> {
        find_relationship(self.relationships, name)
    }
}

/// A record kind mapped to a table.
///
/// An instance owns an ordered attribute map ([`Row`]) and nothing else.
/// Implementations are usually generated with [`model!`](crate::model!).
pub trait Model: Sized {
    /// Short model name, used for default foreign keys and log context.
    const MODEL_NAME: &'static str;

    /// Table the model is stored in.
    const TABLE_NAME: &'static str;

    /// Columns that `update` is allowed to write.
    const FILLABLE: &'static [&'static str];

    /// Primary key column.
    const PRIMARY_KEY: &'static str = "id";

    /// Declared relationships.
    fn relationships() -> &'static [RelationshipInfo] {
        &[]
    }

    /// Materialize an instance from a fetched row.
    fn from_row(row: Row) -> Self;

    /// Borrow the attribute map.
    fn row(&self) -> &Row;

    /// Mutably borrow the attribute map.
    fn row_mut(&mut self) -> &mut Row;

    /// Consume the instance, returning its attributes.
    fn into_row(self) -> Row;

    /// Static description of this model.
    fn meta() -> ModelMeta {
        ModelMeta {
            name: Self::MODEL_NAME,
            table: Self::TABLE_NAME,
            primary_key: Self::PRIMARY_KEY,
            relationships: Self::relationships(),
        }
    }

    /// Read an attribute.
    fn get(&self, column: &str) -> Option<&Value> {
        self.row().get(column)
    }

    /// Assign an attribute (no persistence until a CRUD call).
    fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.row_mut().set(column, value);
    }

    /// The primary key value, when present and integral.
    fn id(&self) -> Option<i64> {
        self.get(Self::PRIMARY_KEY).and_then(Value::as_i64)
    }

    /// True when `column` may be written by `update`.
    fn is_fillable(column: &str) -> bool {
        Self::FILLABLE.contains(&column)
    }

    /// Attributes as an owned map.
    fn to_row(&self) -> Row {
        self.row().clone()
    }

    /// Attributes serialized as a JSON object.
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self.row())
    }
}

/// Declare a model type.
///
/// ```
/// use miniorm_core::{model, Model, RelationshipInfo};
///
/// model! {
///     /// A blog post.
///     pub struct Post {
///         table: "posts",
///         fillable: ["title", "content", "user_id"],
///         relationships: [
///             RelationshipInfo::belongs_to("user", "users", "user_id", "id"),
///         ],
///     }
/// }
///
/// assert_eq!(Post::TABLE_NAME, "posts");
/// assert_eq!(Post::MODEL_NAME, "Post");
/// assert!(Post::meta().relationship("user").is_some());
/// ```
#[macro_export]
macro_rules! model {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            table: $table:literal,
            fillable: [$($fillable:literal),* $(,)?]
            $(, primary_key: $pk:literal)?
            $(, relationships: [$($rel:expr),* $(,)?])?
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            attributes: $crate::Row,
        }

        impl $crate::Model for $name {
            const MODEL_NAME: &'static str = stringify!($name);
            const TABLE_NAME: &'static str = $table;
            const FILLABLE: &'static [&'static str] = &[$($fillable),*];
            const PRIMARY_KEY: &'static str = $crate::__model_primary_key!($($pk)?);

            fn relationships() -> &'static [$crate::RelationshipInfo] {
                static RELATIONSHIPS: &[$crate::RelationshipInfo] = &[$($($rel),*)?];
                RELATIONSHIPS
            }

            fn from_row(row: $crate::Row) -> Self {
                Self { attributes: row }
            }

            fn row(&self) -> &$crate::Row {
                &self.attributes
            }

            fn row_mut(&mut self) -> &mut $crate::Row {
                &mut self.attributes
            }

            fn into_row(self) -> $crate::Row {
                self.attributes
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __model_primary_key {
    () => {
        "id"
    };
    ($pk:literal) => {
        $pk
    };
}
