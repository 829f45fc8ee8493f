//! Eager loading: attach one relation to a page of rows with one query.

use std::collections::HashSet;

use miniorm_core::{Connection, ModelMeta, RelationKey, RelationshipInfo, Result, Row, Value};

use crate::relation::{RelationLoader, collect};

/// Attach `info` to every row in `rows`.
///
/// Local key values are collected (distinct, first-seen order), resolved in
/// one batch and attached under the relation name. Rows whose key is missing
/// or unmatched get the empty result for the relation kind.
pub(crate) fn attach<C: Connection + ?Sized>(
    loader: &RelationLoader<C>,
    meta: &ModelMeta,
    info: &RelationshipInfo,
    rows: &mut [Row],
) -> Result<()> {
    let mut seen = HashSet::new();
    let keys: Vec<RelationKey> = rows
        .iter()
        .filter_map(|row| row.get(info.local_key).and_then(Value::relation_key))
        .filter(|key| seen.insert(key.clone()))
        .collect();

    tracing::debug!(
        model = meta.name,
        relation = info.name,
        parents = rows.len(),
        keys = keys.len(),
        "Eager loading relation"
    );

    let grouped = loader.load_batch(info, &keys)?;
    for row in rows.iter_mut() {
        let related = row
            .get(info.local_key)
            .and_then(Value::relation_key)
            .and_then(|key| grouped.get(&key))
            .cloned()
            .unwrap_or_default();
        row.set_relation(info.name, collect(info.kind, related));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;
    use miniorm_core::{Model, Related, model};

    model! {
        struct Post {
            table: "posts",
            fillable: ["title", "content", "user_id"],
            relationships: [
                RelationshipInfo::belongs_to("user", "users", "user_id", "id"),
            ],
        }
    }

    model! {
        struct User {
            table: "users",
            fillable: ["name"],
            relationships: [
                RelationshipInfo::has_many("posts", "posts", "user_id", "id"),
            ],
        }
    }

    #[test]
    fn test_each_post_gets_its_author_from_one_query() {
        let db = TestDb::seeded();
        let builder = db
            .builder()
            .for_model::<Post>()
            .unwrap()
            .with(["user"])
            .unwrap()
            .order_by("id", "ASC")
            .unwrap();

        let before = db.statements().len();
        let posts = builder.get_models::<Post>().unwrap();
        let issued = &db.statements()[before..];
        // The posts page, then the users batch (catalog lookups for users may
        // precede it on a cold cache).
        assert_eq!(issued.first().map(String::as_str), Some("SELECT * FROM posts ORDER BY id ASC"));
        assert_eq!(issued.iter().filter(|s| s.contains("FROM users WHERE")).count(), 1);

        assert_eq!(posts.len(), 4);
        let authors: Vec<Option<&str>> = posts
            .iter()
            .map(|p| {
                p.row()
                    .relation("user")
                    .and_then(Related::single)
                    .and_then(|u| u.get("name"))
                    .and_then(Value::as_str)
            })
            .collect();
        assert_eq!(authors, vec![Some("Ali"), Some("Ali"), Some("Veli"), None]);
    }

    #[test]
    fn test_has_many_attaches_empty_list_for_childless_parent() {
        let db = TestDb::seeded();
        let users = db
            .builder()
            .for_model::<User>()
            .unwrap()
            .with(["posts"])
            .unwrap()
            .order_by("id", "ASC")
            .unwrap()
            .get()
            .unwrap();

        let counts: Vec<usize> = users
            .iter()
            .map(|u| u.relation("posts").map_or(0, |r| r.many().len()))
            .collect();
        assert_eq!(counts, vec![2, 1, 0]);
        assert!(users.iter().all(|u| u.relation("posts").is_some()));
    }

    #[test]
    fn test_no_rows_no_relation_query() {
        let db = TestDb::seeded();
        let builder = db
            .builder()
            .for_model::<Post>()
            .unwrap()
            .with(["user"])
            .unwrap()
            .filter_eq("id", 999)
            .unwrap();
        let before = db.statements().len();
        assert!(builder.get().unwrap().is_empty());
        assert_eq!(db.statements().len(), before + 1);
    }
}
