//! The fluent SELECT builder.

use std::fmt;
use std::sync::Arc;

use miniorm_core::{
    Binding, Connection, Error, Model, ModelMeta, QueryErrorKind, RelationshipInfo, Result, Row,
    Value, ensure_identifier, is_safe_qualified_name,
};
use miniorm_schema::SchemaCache;

use crate::eager;
use crate::exec;
use crate::operator::{Operator, Order};
use crate::relation::RelationLoader;

/// A validated, parameterized SELECT over one table.
///
/// Every structural name is checked twice before it is accepted: it must be
/// a safe identifier and it must exist in the schema. Every value becomes a
/// named binding. Methods that validate return `Result<Self>`, so a chain
/// stops at the first rejected input and nothing is executed.
///
/// ```ignore
/// let rows = QueryBuilder::new(conn, schema)
///     .table("users")?
///     .filter("status", "=", "active")?
///     .filter("age", "BETWEEN", [18, 30])?
///     .order_by("name", "ASC")?
///     .limit(10, 0)
///     .get()?;
/// ```
pub struct QueryBuilder<C: Connection + ?Sized> {
    conn: Arc<C>,
    schema: Arc<SchemaCache>,
    table: Option<String>,
    model: Option<ModelMeta>,
    columns: Vec<String>,
    predicates: Vec<String>,
    bindings: Vec<Binding>,
    order: Option<(String, Order)>,
    limit: Option<(u64, u64)>,
    relations: Vec<&'static RelationshipInfo>,
}

impl<C: Connection + ?Sized> QueryBuilder<C> {
    /// Start an empty builder. A table (or model) must be set before any
    /// column-level call.
    pub fn new(conn: Arc<C>, schema: Arc<SchemaCache>) -> Self {
        Self {
            conn,
            schema,
            table: None,
            model: None,
            columns: Vec::new(),
            predicates: Vec::new(),
            bindings: Vec::new(),
            order: None,
            limit: None,
            relations: Vec::new(),
        }
    }

    /// The connection statements run on.
    #[must_use]
    pub fn connection(&self) -> &Arc<C> {
        &self.conn
    }

    /// The schema cache used for validation.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaCache> {
        &self.schema
    }

    /// The selected table, if any.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The target model, if one was set.
    #[must_use]
    pub fn model_meta(&self) -> Option<&ModelMeta> {
        self.model.as_ref()
    }

    /// Bindings accumulated so far, in predicate order.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Select the table to query.
    pub fn table(mut self, table: &str) -> Result<Self> {
        ensure_identifier("table", table)?;
        if !self.schema.has_table(&*self.conn, table)? {
            return Err(Error::invalid_argument(format!("Table not found: {table}")));
        }
        self.table = Some(table.to_string());
        Ok(self)
    }

    /// Bind the builder to a model: its table becomes the queried table and
    /// its relationships become available to [`with`](Self::with).
    pub fn model(self, meta: ModelMeta) -> Result<Self> {
        if !is_safe_qualified_name(meta.name) {
            return Err(Error::invalid_argument(format!(
                "Invalid model name: {}",
                meta.name
            )));
        }
        let mut builder = self.table(meta.table)?;
        builder.model = Some(meta);
        Ok(builder)
    }

    /// Shorthand for `model(M::meta())`.
    pub fn for_model<M: Model>(self) -> Result<Self> {
        self.model(M::meta())
    }

    /// Replace the projection. `"*"` is accepted as is; an empty list means
    /// `*`.
    pub fn select(mut self, columns: &[&str]) -> Result<Self> {
        let mut projection = Vec::with_capacity(columns.len());
        for column in columns.iter().map(|c| c.trim()) {
            if column != "*" {
                self.check_column(column)?;
            }
            projection.push(column.to_string());
        }
        self.columns = projection;
        Ok(self)
    }

    /// Like [`select`](Self::select) with a comma-separated list
    /// (`"id, name"`).
    pub fn select_list(self, columns: &str) -> Result<Self> {
        let parts: Vec<&str> = columns
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        self.select(&parts)
    }

    /// Add a predicate, AND-ed with the existing ones.
    ///
    /// `IN`/`NOT IN` take an array (`vec![..]` or `[..]`); an empty array
    /// matches nothing (`IN`) or everything (`NOT IN`). `BETWEEN` takes an
    /// array of exactly two scalars. `IS`/`IS NOT` with `Value::Null` render
    /// `IS NULL`/`IS NOT NULL`. Every other operator takes a scalar.
    pub fn filter(mut self, column: &str, operator: &str, value: impl Into<Value>) -> Result<Self> {
        let op = Operator::parse(operator)?;
        self.check_column(column)?;
        let value = value.into();
        let prefix = format!(":p{}_{}", self.predicates.len(), column);

        let predicate = if op.is_membership() {
            let items = value.as_array().ok_or_else(|| {
                Error::invalid_argument(format!("Operator {op} requires an array value"))
            })?;
            if items.is_empty() {
                // Constant predicate; nothing to bind.
                let constant = if op == Operator::In { "1 = 0" } else { "1 = 1" };
                constant.to_string()
            } else {
                let mut placeholders = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let name = format!("{prefix}_{i}");
                    placeholders.push(name.clone());
                    self.bindings.push((name, scalar(op, item)?.clone()));
                }
                format!("{column} {op} ({})", placeholders.join(", "))
            }
        } else if op == Operator::Between {
            match value.as_array() {
                Some([low, high]) => {
                    let (lo_name, hi_name) = (format!("{prefix}_1"), format!("{prefix}_2"));
                    self.bindings.push((lo_name.clone(), scalar(op, low)?.clone()));
                    self.bindings.push((hi_name.clone(), scalar(op, high)?.clone()));
                    format!("{column} BETWEEN {lo_name} AND {hi_name}")
                }
                _ => {
                    return Err(Error::invalid_argument(
                        "Operator BETWEEN requires exactly two values",
                    ));
                }
            }
        } else if op.is_null_test() && value.is_null() {
            format!("{column} {op} NULL")
        } else {
            let value = scalar(op, &value)?.clone();
            self.bindings.push((prefix.clone(), value));
            format!("{column} {op} {prefix}")
        };

        self.predicates.push(predicate);
        Ok(self)
    }

    /// Equality predicate.
    pub fn filter_eq(self, column: &str, value: impl Into<Value>) -> Result<Self> {
        self.filter(column, "=", value)
    }

    /// Set the single ORDER BY column. Direction is `ASC` or `DESC`.
    pub fn order_by(mut self, column: &str, direction: &str) -> Result<Self> {
        self.check_column(column)?;
        let order = Order::parse(direction)?;
        self.order = Some((column.to_string(), order));
        Ok(self)
    }

    /// Set LIMIT and OFFSET.
    pub fn limit(mut self, limit: u64, offset: u64) -> Self {
        self.limit = Some((limit, offset));
        self
    }

    /// Request eager loading of named relations of the target model.
    pub fn with<I, S>(mut self, relations: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let meta = self.model.ok_or_else(|| {
            Error::invalid_argument("Eager loading requires a model; call model() first")
        })?;
        for name in relations {
            let name = name.as_ref();
            ensure_identifier("relation", name)?;
            let info = meta.relationship(name).ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Relation {name} is not defined on {}",
                    meta.name
                ))
            })?;
            if !self.relations.iter().any(|r| r.name == info.name) {
                self.relations.push(info);
            }
        }
        Ok(self)
    }

    /// Compile to `(sql, bindings)` without executing.
    pub fn to_sql(&self) -> Result<(String, Vec<Binding>)> {
        let table = self.require_table()?;
        let projection = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {projection} FROM {table}");
        sql.push_str(&self.where_clause());
        if let Some((column, order)) = &self.order {
            sql.push_str(&format!(" ORDER BY {column} {}", order.as_sql()));
        }
        if let Some((limit, offset)) = self.limit {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        Ok((sql, self.bindings.clone()))
    }

    /// Execute and return every matching row, with requested relations
    /// attached.
    pub fn get(&self) -> Result<Vec<Row>> {
        let (sql, bindings) = self.to_sql()?;
        let mut rows = exec::fetch(
            &*self.conn,
            &sql,
            &bindings,
            QueryErrorKind::Execution,
            "Database query failed.",
        )?;

        if let Some(meta) = &self.model {
            if !self.relations.is_empty() && !rows.is_empty() {
                let loader = RelationLoader::new(Arc::clone(&self.conn), Arc::clone(&self.schema));
                for info in &self.relations {
                    eager::attach(&loader, meta, info, &mut rows)?;
                }
            }
        }
        Ok(rows)
    }

    /// Execute and materialize each row as `M`.
    pub fn get_models<M: Model>(&self) -> Result<Vec<M>> {
        Ok(self.get()?.into_iter().map(M::from_row).collect())
    }

    /// The first matching row. Keeps any offset already set.
    pub fn first_row(&self) -> Result<Option<Row>> {
        let offset = self.limit.map_or(0, |(_, offset)| offset);
        let single = Self {
            limit: Some((1, offset)),
            ..self.clone()
        };
        Ok(single.get()?.into_iter().next())
    }

    /// The first matching row materialized as `M`.
    pub fn first<M: Model>(&self) -> Result<Option<M>> {
        Ok(self.first_row()?.map(M::from_row))
    }

    /// True when at least one row matches. Ignores projection, ordering and
    /// limit.
    pub fn exists(&self) -> Result<bool> {
        let table = self.require_table()?;
        let sql = format!("SELECT 1 FROM {table}{} LIMIT 1", self.where_clause());
        let rows = exec::fetch(
            &*self.conn,
            &sql,
            &self.bindings,
            QueryErrorKind::Execution,
            "Exists query failed.",
        )?;
        Ok(!rows.is_empty())
    }

    /// Number of matching rows. Ignores projection, ordering and limit.
    pub fn count(&self) -> Result<u64> {
        let table = self.require_table()?;
        let sql = format!("SELECT COUNT(*) AS cnt FROM {table}{}", self.where_clause());
        let rows = exec::fetch(
            &*self.conn,
            &sql,
            &self.bindings,
            QueryErrorKind::Execution,
            "Count query failed.",
        )?;
        Ok(rows
            .first()
            .and_then(|row| row.get("cnt"))
            .and_then(Value::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0))
    }

    fn require_table(&self) -> Result<&str> {
        self.table
            .as_deref()
            .ok_or_else(|| Error::invalid_argument("No table selected; call table() first"))
    }

    fn check_column(&self, column: &str) -> Result<()> {
        ensure_identifier("column", column)?;
        let table = self.require_table()?;
        if !self.schema.has_column(&*self.conn, table, column)? {
            return Err(Error::invalid_argument(format!(
                "Column not found: {table}.{column}"
            )));
        }
        Ok(())
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }
}

fn scalar(op: Operator, value: &Value) -> Result<&Value> {
    if value.is_scalar() {
        Ok(value)
    } else {
        Err(Error::invalid_argument(format!(
            "Operator {op} requires scalar values"
        )))
    }
}

impl<C: Connection + ?Sized> Clone for QueryBuilder<C> {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            schema: Arc::clone(&self.schema),
            table: self.table.clone(),
            model: self.model,
            columns: self.columns.clone(),
            predicates: self.predicates.clone(),
            bindings: self.bindings.clone(),
            order: self.order.clone(),
            limit: self.limit,
            relations: self.relations.clone(),
        }
    }
}

impl<C: Connection + ?Sized> fmt::Debug for QueryBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("table", &self.table)
            .field("model", &self.model.map(|m| m.name))
            .field("columns", &self.columns)
            .field("predicates", &self.predicates)
            .field("bindings", &self.bindings)
            .field("order", &self.order)
            .field("limit", &self.limit)
            .field(
                "relations",
                &self.relations.iter().map(|r| r.name).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
