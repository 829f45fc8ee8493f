//! Relationship metadata and loaded-relation results.
//!
//! Relationships are declared once per model as static metadata (see
//! [`Model::relationships`](crate::Model::relationships)). The query layer reads
//! these declarations to load related rows one at a time or in batches, so no
//! runtime reflection or naming convention is needed to find keys.

use serde::{Serialize, Serializer};

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// One-to-one: a `User` has one `Profile`.
    HasOne,
    /// Many-to-one: many `Post`s belong to one `User`.
    #[default]
    BelongsTo,
    /// One-to-many: one `User` has many `Post`s.
    HasMany,
    /// Many-to-many: `User`s have many `Role`s via a pivot table.
    BelongsToMany,
}

impl RelationshipKind {
    /// True for kinds that resolve to a list.
    #[must_use]
    pub const fn is_many(self) -> bool {
        matches!(self, RelationshipKind::HasMany | RelationshipKind::BelongsToMany)
    }

    /// Name used in log messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::HasOne => "hasOne",
            RelationshipKind::BelongsTo => "belongsTo",
            RelationshipKind::HasMany => "hasMany",
            RelationshipKind::BelongsToMany => "belongsToMany",
        }
    }
}

/// A pivot table joining two models in a many-to-many relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotTable {
    /// The pivot table name (e.g., `"role_user"`).
    pub table_name: &'static str,

    /// Pivot column pointing at the declaring model (e.g., `"user_id"`).
    pub foreign_pivot_key: &'static str,

    /// Pivot column pointing at the related model (e.g., `"role_id"`).
    pub related_pivot_key: &'static str,
}

impl PivotTable {
    /// Create a new pivot-table definition.
    #[must_use]
    pub const fn new(
        table_name: &'static str,
        foreign_pivot_key: &'static str,
        related_pivot_key: &'static str,
    ) -> Self {
        Self {
            table_name,
            foreign_pivot_key,
            related_pivot_key,
        }
    }
}

/// A declared relationship.
///
/// Keys are described from the declaring model's point of view:
///
/// | kind            | `local_key` (on declaring row) | `remote_key` (matched on)          |
/// |-----------------|--------------------------------|------------------------------------|
/// | `BelongsTo`     | foreign key, e.g. `user_id`    | owner key on related, e.g. `id`    |
/// | `HasOne/HasMany`| local key, e.g. `id`           | foreign key on related, `user_id`  |
/// | `BelongsToMany` | local key, e.g. `id`           | related key joined through pivot   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// Name of the relationship, used by `with(...)` and as the attachment key.
    pub name: &'static str,

    /// The related model's table name.
    pub related_table: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Column read from the declaring row.
    pub local_key: &'static str,

    /// Column matched on the related side.
    pub remote_key: &'static str,

    /// Pivot table for many-to-many relationships.
    pub pivot: Option<PivotTable>,
}

impl RelationshipInfo {
    /// `name` belongs to one row of `related_table` via `foreign_key` on this
    /// model, matched against `owner_key` on the related model.
    #[must_use]
    pub const fn belongs_to(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
        owner_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationshipKind::BelongsTo,
            local_key: foreign_key,
            remote_key: owner_key,
            pivot: None,
        }
    }

    /// `name` is one row of `related_table` whose `foreign_key` equals this
    /// model's `local_key`.
    #[must_use]
    pub const fn has_one(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationshipKind::HasOne,
            local_key,
            remote_key: foreign_key,
            pivot: None,
        }
    }

    /// `name` is every row of `related_table` whose `foreign_key` equals this
    /// model's `local_key`.
    #[must_use]
    pub const fn has_many(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationshipKind::HasMany,
            local_key,
            remote_key: foreign_key,
            pivot: None,
        }
    }

    /// `name` is every row of `related_table` linked through `pivot`.
    #[must_use]
    pub const fn belongs_to_many(
        name: &'static str,
        related_table: &'static str,
        pivot: PivotTable,
        local_key: &'static str,
        related_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationshipKind::BelongsToMany,
            local_key,
            remote_key: related_key,
            pivot: Some(pivot),
        }
    }
}

/// Find a relationship by name.
#[must_use]
pub fn find_relationship(
    relationships: &'static [RelationshipInfo],
    name: &str,
) -> Option<&'static RelationshipInfo> {
    relationships.iter().find(|r| r.name == name)
}

/// Default foreign key column for a model: its short name lowercased plus `_id`
/// (`"User"` becomes `"user_id"`).
#[must_use]
pub fn default_foreign_key(model_name: &str) -> String {
    let short = model_name.rsplit("::").next().unwrap_or(model_name);
    format!("{}_id", short.to_lowercase())
}

/// The result of resolving a relation.
///
/// Single-valued kinds (`BelongsTo`, `HasOne`) produce `Single` or `NotFound`;
/// many-valued kinds (`HasMany`, `BelongsToMany`) always produce `Many`,
/// possibly empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Related<T> {
    /// No related record.
    #[default]
    NotFound,
    /// Exactly one related record.
    Single(T),
    /// Zero or more related records.
    Many(Vec<T>),
}

impl<T> Related<T> {
    /// The empty result for a relationship kind.
    #[must_use]
    pub fn empty(kind: RelationshipKind) -> Self {
        if kind.is_many() {
            Related::Many(Vec::new())
        } else {
            Related::NotFound
        }
    }

    /// True for `NotFound` and for an empty `Many`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Related::NotFound => true,
            Related::Single(_) => false,
            Related::Many(items) => items.is_empty(),
        }
    }

    /// Borrow the single record.
    #[must_use]
    pub fn single(&self) -> Option<&T> {
        match self {
            Related::Single(item) => Some(item),
            _ => None,
        }
    }

    /// Borrow the records of a `Many` result (empty slice otherwise).
    #[must_use]
    pub fn many(&self) -> &[T] {
        match self {
            Related::Many(items) => items,
            _ => &[],
        }
    }

    /// Take the single record.
    pub fn into_single(self) -> Option<T> {
        match self {
            Related::Single(item) => Some(item),
            _ => None,
        }
    }

    /// Take the records as a list (`Single` yields one element).
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Related::NotFound => Vec::new(),
            Related::Single(item) => vec![item],
            Related::Many(items) => items,
        }
    }

    /// Convert every contained record.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Related<U> {
        match self {
            Related::NotFound => Related::NotFound,
            Related::Single(item) => Related::Single(f(item)),
            Related::Many(items) => Related::Many(items.into_iter().map(f).collect()),
        }
    }
}

impl<T: Serialize> Serialize for Related<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Related::NotFound => serializer.serialize_none(),
            Related::Single(item) => item.serialize(serializer),
            Related::Many(items) => items.serialize(serializer),
        }
    }
}
