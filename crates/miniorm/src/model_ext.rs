//! CRUD and relation traversal for every [`Model`].

use std::collections::HashMap;

use miniorm_core::{
    Connection, Error, Model, PivotTable, QueryErrorKind, Related, RelationKey, RelationshipInfo,
    Result, Row, Value, default_foreign_key,
};
use miniorm_query::{DeleteBuilder, InsertBuilder, QueryBuilder, UpdateBuilder};

use crate::database::Database;

/// Database operations available on every model type.
///
/// Implemented for all `M: Model`; import it (or the prelude) and call
/// `User::find(&db, 1)`, `post.belongs_to::<User, _>(&db, None)` and so on.
pub trait ModelExt: Model {
    /// Insert `data` and return the stored record as re-read from the
    /// database.
    ///
    /// The record is looked up by the primary key given in `data`, or by the
    /// engine's last insert id when `data` carries none. Every column must
    /// exist in the table; fillable filtering does not apply to inserts.
    fn create<C: Connection + 'static>(db: &Database<C>, data: &Row) -> Result<Self> {
        let conn = db.connection()?;
        let id = InsertBuilder::new(Self::TABLE_NAME, data)
            .execute(&*conn, db.schema())
            .map_err(|e| {
                tracing::error!(table = Self::TABLE_NAME, data = ?data, error = %e, "Create failed");
                persistence(e, QueryErrorKind::Write, "Create failed.")
            })?;

        let key = match data.get(Self::PRIMARY_KEY) {
            Some(value) if !value.is_null() => value.clone(),
            _ => Value::from(id),
        };
        tracing::debug!(table = Self::TABLE_NAME, key = %key, "Record created");

        Self::find(db, key.clone())?.ok_or_else(|| {
            tracing::error!(
                table = Self::TABLE_NAME,
                key = %key,
                "Created record not found on re-read"
            );
            Error::query(QueryErrorKind::Read, "Created record could not be read back.")
        })
    }

    /// The record with primary key `id`, if any.
    fn find<C: Connection + 'static>(
        db: &Database<C>,
        id: impl Into<Value>,
    ) -> Result<Option<Self>> {
        let id = id.into();
        db.model::<Self>()?
            .filter_eq(Self::PRIMARY_KEY, id.clone())?
            .first::<Self>()
            .map_err(|e| {
                tracing::error!(table = Self::TABLE_NAME, id = %id, error = %e, "Find failed");
                persistence(e, QueryErrorKind::Read, "Find failed.")
            })
    }

    /// Write the fillable subset of `data` to record `id` and return the
    /// re-read record (`None` when `id` does not exist).
    ///
    /// Columns outside [`Model::FILLABLE`] are dropped without error. When
    /// nothing fillable remains, no UPDATE is issued.
    fn update<C: Connection + 'static>(
        db: &Database<C>,
        id: impl Into<Value>,
        data: &Row,
    ) -> Result<Option<Self>> {
        let id = id.into();
        let mut fillable = data.clone();
        fillable.retain(Self::is_fillable);

        if fillable.len() < data.len() {
            tracing::debug!(
                table = Self::TABLE_NAME,
                dropped = data.len() - fillable.len(),
                "Ignoring non-fillable columns in update"
            );
        }

        if !fillable.is_empty() {
            let conn = db.connection()?;
            UpdateBuilder::new(Self::TABLE_NAME, Self::PRIMARY_KEY, id.clone())
                .set_all(&fillable)
                .execute(&*conn, db.schema())
                .map_err(|e| {
                    tracing::error!(
                        table = Self::TABLE_NAME,
                        id = %id,
                        data = ?fillable,
                        error = %e,
                        "Update failed"
                    );
                    persistence(e, QueryErrorKind::Write, "Update failed.")
                })?;
        }

        Self::find(db, id)
    }

    /// Delete record `id`. True when a row was removed.
    fn delete<C: Connection + 'static>(db: &Database<C>, id: impl Into<Value>) -> Result<bool> {
        let id = id.into();
        let conn = db.connection()?;
        let removed = DeleteBuilder::new(Self::TABLE_NAME, Self::PRIMARY_KEY, id.clone())
            .execute(&*conn, db.schema())
            .map_err(|e| {
                tracing::error!(table = Self::TABLE_NAME, id = %id, error = %e, "Delete failed");
                persistence(e, QueryErrorKind::Write, "Delete failed.")
            })?;
        Ok(removed > 0)
    }

    /// A query over this model's table.
    fn query<C: Connection + 'static>(db: &Database<C>) -> Result<QueryBuilder<C>> {
        db.model::<Self>()
    }

    /// Every record of this model.
    fn all<C: Connection + 'static>(db: &Database<C>) -> Result<Vec<Self>> {
        Self::query(db)?.get_models::<Self>()
    }

    /// A query with one predicate already applied.
    fn filter<C: Connection + 'static>(
        db: &Database<C>,
        column: &str,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<QueryBuilder<C>> {
        Self::query(db)?.filter(column, operator, value)
    }

    /// A query with one equality predicate already applied.
    fn filter_eq<C: Connection + 'static>(
        db: &Database<C>,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<QueryBuilder<C>> {
        Self::query(db)?.filter_eq(column, value)
    }

    /// A query that eager-loads the named relations.
    fn with<C, I, S>(db: &Database<C>, relations: I) -> Result<QueryBuilder<C>>
    where
        C: Connection + 'static,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::query(db)?.with(relations)
    }

    /// Number of records of this model.
    fn count<C: Connection + 'static>(db: &Database<C>) -> Result<u64> {
        Self::query(db)?.count()
    }

    /// The record of `R` this record points to through `foreign_key`
    /// (default: `R`'s short name lowercased plus `_id`).
    #[track_caller]
    fn belongs_to<R: Model, C: Connection + 'static>(
        &self,
        db: &Database<C>,
        foreign_key: Option<&str>,
    ) -> Result<Related<R>> {
        let foreign_key = foreign_key.map_or_else(|| default_foreign_key(R::MODEL_NAME), str::to_string);
        let Some(key) = relation_key::<Self>(self.row(), &foreign_key, R::MODEL_NAME) else {
            return Ok(Related::NotFound);
        };
        db.record_relation_load(Self::MODEL_NAME, R::MODEL_NAME);

        let mut owners = Self::belongs_to_batch::<R, C>(db, std::slice::from_ref(&key))?;
        Ok(owners.remove(&key).map_or(Related::NotFound, Related::Single))
    }

    /// Owners of many records at once: each key in `keys` (foreign key
    /// values collected by the caller) maps to the `R` whose primary key
    /// equals it. Keys without an owner are absent. One query.
    fn belongs_to_batch<R: Model, C: Connection + 'static>(
        db: &Database<C>,
        keys: &[RelationKey],
    ) -> Result<HashMap<RelationKey, R>> {
        Ok(db
            .relations()?
            .belongs_to_batch(R::TABLE_NAME, R::PRIMARY_KEY, keys)?
            .into_iter()
            .map(|(key, row)| (key, R::from_row(row)))
            .collect())
    }

    /// The single `R` whose `foreign_key` (default: this model's short name
    /// lowercased plus `_id`) equals this record's primary key.
    #[track_caller]
    fn has_one<R: Model, C: Connection + 'static>(
        &self,
        db: &Database<C>,
        foreign_key: Option<&str>,
    ) -> Result<Related<R>> {
        let Some(key) = relation_key::<Self>(self.row(), Self::PRIMARY_KEY, R::MODEL_NAME) else {
            return Ok(Related::NotFound);
        };
        db.record_relation_load(Self::MODEL_NAME, R::MODEL_NAME);

        let mut found = Self::has_one_batch::<R, C>(db, std::slice::from_ref(&key), foreign_key)?;
        Ok(found.remove(&key).map_or(Related::NotFound, Related::Single))
    }

    /// Batch form of [`has_one`](Self::has_one): primary key values of
    /// records of this model map to their `R`.
    fn has_one_batch<R: Model, C: Connection + 'static>(
        db: &Database<C>,
        keys: &[RelationKey],
        foreign_key: Option<&str>,
    ) -> Result<HashMap<RelationKey, R>> {
        let foreign_key = foreign_key.map_or_else(|| default_foreign_key(Self::MODEL_NAME), str::to_string);
        Ok(db
            .relations()?
            .rows_by_key(R::TABLE_NAME, &foreign_key, keys)?
            .into_iter()
            .filter_map(|(key, rows)| rows.into_iter().next().map(|row| (key, R::from_row(row))))
            .collect())
    }

    /// Every `R` whose `foreign_key` (default: this model's short name
    /// lowercased plus `_id`) equals this record's primary key.
    #[track_caller]
    fn has_many<R: Model, C: Connection + 'static>(
        &self,
        db: &Database<C>,
        foreign_key: Option<&str>,
    ) -> Result<Related<R>> {
        let Some(key) = relation_key::<Self>(self.row(), Self::PRIMARY_KEY, R::MODEL_NAME) else {
            return Ok(Related::Many(Vec::new()));
        };
        db.record_relation_load(Self::MODEL_NAME, R::MODEL_NAME);

        let mut found = Self::has_many_batch::<R, C>(db, std::slice::from_ref(&key), foreign_key)?;
        Ok(Related::Many(found.remove(&key).unwrap_or_default()))
    }

    /// Batch form of [`has_many`](Self::has_many).
    fn has_many_batch<R: Model, C: Connection + 'static>(
        db: &Database<C>,
        keys: &[RelationKey],
        foreign_key: Option<&str>,
    ) -> Result<HashMap<RelationKey, Vec<R>>> {
        let foreign_key = foreign_key.map_or_else(|| default_foreign_key(Self::MODEL_NAME), str::to_string);
        Ok(db
            .relations()?
            .rows_by_key(R::TABLE_NAME, &foreign_key, keys)?
            .into_iter()
            .map(|(key, rows)| (key, rows.into_iter().map(R::from_row).collect()))
            .collect())
    }

    /// Every `R` linked to this record through `pivot`.
    #[track_caller]
    fn belongs_to_many<R: Model, C: Connection + 'static>(
        &self,
        db: &Database<C>,
        pivot: PivotTable,
    ) -> Result<Related<R>> {
        let Some(key) = relation_key::<Self>(self.row(), Self::PRIMARY_KEY, R::MODEL_NAME) else {
            return Ok(Related::Many(Vec::new()));
        };
        db.record_relation_load(Self::MODEL_NAME, R::MODEL_NAME);

        let mut found = Self::belongs_to_many_batch::<R, C>(db, std::slice::from_ref(&key), pivot)?;
        Ok(Related::Many(found.remove(&key).unwrap_or_default()))
    }

    /// Batch form of [`belongs_to_many`](Self::belongs_to_many).
    fn belongs_to_many_batch<R: Model, C: Connection + 'static>(
        db: &Database<C>,
        keys: &[RelationKey],
        pivot: PivotTable,
    ) -> Result<HashMap<RelationKey, Vec<R>>> {
        let info = RelationshipInfo::belongs_to_many(
            R::MODEL_NAME,
            R::TABLE_NAME,
            pivot,
            Self::PRIMARY_KEY,
            R::PRIMARY_KEY,
        );
        Ok(db
            .relations()?
            .load_batch(&info, keys)?
            .into_iter()
            .map(|(key, rows)| (key, rows.into_iter().map(R::from_row).collect()))
            .collect())
    }

    /// Resolve a declared relation by name.
    #[track_caller]
    fn related<C: Connection + 'static>(&self, db: &Database<C>, name: &str) -> Result<Related<Row>> {
        let info = Self::meta().relationship(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "Relation {name} is not defined on {}",
                Self::MODEL_NAME
            ))
        })?;
        if self.row().get(info.local_key).is_some_and(|v| !v.is_null()) {
            db.record_relation_load(Self::MODEL_NAME, info.name);
        }
        db.relations()?.load(Self::MODEL_NAME, info, self.row())
    }
}

impl<M: Model> ModelExt for M {}

/// The relation key held in `column`, or `None` (with a warning) when the
/// record has no usable value there.
fn relation_key<M: Model>(row: &Row, column: &str, related: &str) -> Option<RelationKey> {
    let key = row.get(column).and_then(Value::relation_key);
    if key.is_none() {
        tracing::warn!(
            model = M::MODEL_NAME,
            related = related,
            key = column,
            "Relation key missing on record; returning empty result"
        );
    }
    key
}

/// Re-signal a failed statement as a persistence error of `kind`. Errors
/// raised before execution keep their own type.
fn persistence(err: Error, kind: QueryErrorKind, message: &'static str) -> Error {
    match err {
        Error::Query(_) => Error::query(kind, message),
        other => other,
    }
}
