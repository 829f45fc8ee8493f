#![cfg(feature = "sqlite")]

mod common;

use common::{Fixture, Post, Profile, ROLE_USER, Role, User, text};
use miniorm::n1_detection::REPORTED_SITES;
use miniorm::prelude::*;
use miniorm::RelationshipKind;

const BLOG: &str = "
    INSERT INTO users (id, name, email) VALUES
        (1, 'Ali', 'ali@gmail.com'),
        (2, 'Veli', 'veli@gmail.com'),
        (3, 'Ayse', 'ayse@gmail.com');
    INSERT INTO posts (id, title, user_id) VALUES
        (10, 'First', 1),
        (11, 'Second', 1),
        (12, 'Third', 2),
        (13, 'Orphan', NULL);
    INSERT INTO profiles (id, user_id, bio) VALUES (1, 1, 'Rustacean');
    INSERT INTO roles (id, name) VALUES (1, 'admin'), (2, 'editor'), (3, 'viewer');
    INSERT INTO role_user (user_id, role_id) VALUES (1, 1), (1, 2), (2, 3);
";

fn post(fx: &Fixture, id: i64) -> Post {
    Post::find(&fx.db, id).unwrap().expect("seeded post")
}

fn user(fx: &Fixture, id: i64) -> User {
    User::find(&fx.db, id).unwrap().expect("seeded user")
}

#[test]
fn eager_belongs_to_issues_one_query_per_relation() {
    let fx = Fixture::with_sql(
        "INSERT INTO users (id, name) VALUES (1, 'Ali');
         INSERT INTO posts (id, title, user_id) VALUES (10, 'a', 1), (11, 'b', 1), (12, 'c', 2);",
    );
    let mark = fx.mark();

    let posts = Post::with(&fx.db, ["user"])
        .and_then(|q| q.order_by("id", "ASC"))
        .unwrap()
        .get()
        .unwrap();

    let statements = fx.data_since(mark);
    assert_eq!(statements.len(), 2, "{statements:#?}");
    assert!(statements[0].starts_with("SELECT * FROM posts"));
    assert!(statements[1].starts_with("SELECT * FROM users WHERE id IN"));

    let authors: Vec<Option<&str>> = posts
        .iter()
        .map(|p| p.relation("user").and_then(Related::single).and_then(|u| text(u, "name")))
        .collect();
    assert_eq!(authors, [Some("Ali"), Some("Ali"), None]);
    assert_eq!(posts[2].relation("user"), Some(&Related::NotFound));
}

#[test]
fn eager_has_many_groups_children_per_parent() {
    let fx = Fixture::with_sql(BLOG);
    let mark = fx.mark();

    let users = User::with(&fx.db, ["posts", "posts"])
        .and_then(|q| q.order_by("id", "ASC"))
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(fx.data_since(mark).len(), 2);

    let counts: Vec<usize> = users
        .iter()
        .map(|u| u.relation("posts").map_or(0, |r| r.many().len()))
        .collect();
    assert_eq!(counts, [2, 1, 0]);
    assert_eq!(users[2].relation("posts"), Some(&Related::Many(Vec::new())));
}

#[test]
fn eager_many_to_many_through_pivot() {
    let fx = Fixture::with_sql(BLOG);
    let mark = fx.mark();

    let users = User::with(&fx.db, ["roles", "profile"])
        .and_then(|q| q.order_by("id", "ASC"))
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(fx.data_since(mark).len(), 3);

    let roles: Vec<Vec<&str>> = users
        .iter()
        .map(|u| {
            let mut names: Vec<&str> = u
                .relation("roles")
                .map(|r| r.many().iter().filter_map(|row| text(row, "name")).collect())
                .unwrap_or_default();
            names.sort_unstable();
            names
        })
        .collect();
    assert_eq!(roles, [vec!["admin", "editor"], vec!["viewer"], vec![]]);

    let admin = users[0].relation("roles").unwrap().many()[0].clone();
    assert!(!admin.contains("__miniorm_pivot_key"));

    let bio = users[0]
        .relation("profile")
        .and_then(Related::single)
        .and_then(|p| text(p, "bio"));
    assert_eq!(bio, Some("Rustacean"));
    assert_eq!(users[1].relation("profile"), Some(&Related::NotFound));
}

#[test]
fn eager_load_of_undeclared_relation_is_rejected() {
    let fx = Fixture::with_sql(BLOG);
    let mark = fx.mark();
    let err = Post::with(&fx.db, ["comments"]).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(fx.data_since(mark).is_empty());
}

#[test]
fn eager_load_with_no_rows_skips_relation_queries() {
    let fx = Fixture::with_sql(BLOG);
    let mark = fx.mark();
    let posts = Post::with(&fx.db, ["user"])
        .and_then(|q| q.filter_eq("title", "Missing"))
        .unwrap()
        .get()
        .unwrap();
    assert!(posts.is_empty());
    assert_eq!(fx.data_since(mark).len(), 1);
}

#[test]
fn belongs_to_resolves_the_owner() {
    let fx = Fixture::with_sql(BLOG);
    let author = post(&fx, 12).belongs_to::<User, _>(&fx.db, None).unwrap();
    assert_eq!(author.single().and_then(|u| u.id()), Some(2));

    let explicit = post(&fx, 10)
        .belongs_to::<User, _>(&fx.db, Some("user_id"))
        .unwrap()
        .into_single()
        .unwrap();
    assert_eq!(explicit.get("name").and_then(Value::as_str), Some("Ali"));
}

#[test]
fn missing_relation_key_returns_empty_without_querying() {
    let fx = Fixture::with_sql(BLOG);
    let orphan = post(&fx, 13);
    let scope = fx.db.n1_scope();
    let mark = fx.mark();

    let author = orphan.belongs_to::<User, _>(&fx.db, None).unwrap();
    assert_eq!(author, Related::NotFound);

    let by_name = orphan.related(&fx.db, "user").unwrap();
    assert_eq!(by_name, Related::NotFound);

    let unsaved = User::from_row(attrs! { "name" => "Draft" });
    assert_eq!(
        unsaved.has_many::<Post, _>(&fx.db, None).unwrap(),
        Related::Many(Vec::new())
    );

    assert!(fx.since(mark).is_empty());
    assert_eq!(scope.stats().total_loads, 0);
}

#[test]
fn has_one_and_has_many() {
    let fx = Fixture::with_sql(BLOG);
    let ali = user(&fx, 1);

    let profile = ali.has_one::<Profile, _>(&fx.db, None).unwrap();
    assert_eq!(
        profile.single().and_then(|p| p.get("bio")).and_then(Value::as_str),
        Some("Rustacean")
    );
    assert_eq!(
        user(&fx, 2).has_one::<Profile, _>(&fx.db, None).unwrap(),
        Related::NotFound
    );

    let mut titles: Vec<String> = ali
        .has_many::<Post, _>(&fx.db, None)
        .unwrap()
        .into_vec()
        .iter()
        .filter_map(|p| p.get("title").and_then(Value::as_str).map(str::to_string))
        .collect();
    titles.sort();
    assert_eq!(titles, ["First", "Second"]);

    assert!(user(&fx, 3).has_many::<Post, _>(&fx.db, None).unwrap().is_empty());
}

#[test]
fn belongs_to_many_through_pivot() {
    let fx = Fixture::with_sql(BLOG);

    let roles = user(&fx, 1).belongs_to_many::<Role, _>(&fx.db, ROLE_USER).unwrap();
    let mut names: Vec<&str> = roles
        .many()
        .iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str))
        .collect();
    names.sort_unstable();
    assert_eq!(names, ["admin", "editor"]);

    let none = user(&fx, 3).belongs_to_many::<Role, _>(&fx.db, ROLE_USER).unwrap();
    assert_eq!(none, Related::Many(Vec::new()));
}

#[test]
fn batch_lookups_run_one_statement() {
    let fx = Fixture::with_sql(BLOG);
    let keys = [RelationKey::Int(1), RelationKey::Int(2), RelationKey::Int(99)];
    let mark = fx.mark();

    let owners = Post::belongs_to_batch::<User, _>(&fx.db, &keys).unwrap();
    assert_eq!(owners.len(), 2);
    assert_eq!(owners[&RelationKey::Int(2)].id(), Some(2));
    assert!(!owners.contains_key(&RelationKey::Int(99)));

    let posts = User::has_many_batch::<Post, _>(&fx.db, &keys, None).unwrap();
    assert_eq!(posts[&RelationKey::Int(1)].len(), 2);
    assert_eq!(posts[&RelationKey::Int(2)].len(), 1);

    let roles = User::belongs_to_many_batch::<Role, _>(&fx.db, &keys, ROLE_USER).unwrap();
    assert_eq!(roles[&RelationKey::Int(1)].len(), 2);
    assert_eq!(roles[&RelationKey::Int(2)].len(), 1);

    assert_eq!(fx.data_since(mark).len(), 3);
    assert!(
        Post::belongs_to_batch::<User, _>(&fx.db, &[])
            .unwrap()
            .is_empty()
    );
    assert_eq!(fx.data_since(mark).len(), 3);
}

#[test]
fn related_by_name_follows_declarations() {
    let fx = Fixture::with_sql(BLOG);
    let ali = user(&fx, 1);

    let posts = ali.related(&fx.db, "posts").unwrap();
    assert_eq!(posts.many().len(), 2);

    let roles = ali.related(&fx.db, "roles").unwrap();
    assert_eq!(roles.many().len(), 2);

    let err = ali.related(&fx.db, "comments").unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(
        User::meta().relationship("roles").map(|r| r.kind),
        Some(RelationshipKind::BelongsToMany)
    );
}

#[test]
fn per_record_loads_are_counted_inside_an_n1_scope() {
    let fx = Fixture::with_sql(BLOG);
    let posts = Post::filter(&fx.db, "user_id", "IS NOT", Value::Null)
        .unwrap()
        .get_models::<Post>()
        .unwrap();
    assert_eq!(posts.len(), 3);

    posts[0].belongs_to::<User, _>(&fx.db, None).unwrap();
    assert_eq!(fx.db.n1_stats().total_loads, 0, "off outside a scope");

    {
        let scope = fx.db.n1_scope();
        for post in &posts {
            post.belongs_to::<User, _>(&fx.db, None).unwrap();
        }

        let stats = scope.stats();
        assert_eq!(stats.total_loads, 3);
        assert_eq!(stats.relations_loaded, 1);
        assert_eq!(stats.potential_n1, 1);
        assert_eq!(fx.db.n1_tracker().count_for("Post", "User"), 3);
    }
    assert_eq!(fx.db.n1_stats().total_loads, 0);

    let scope = fx.db.n1_scope();
    Post::with(&fx.db, ["user"]).unwrap().get().unwrap();
    assert_eq!(scope.stats().total_loads, 0);
}

#[test]
fn long_running_scope_keeps_a_bounded_call_site_history() {
    let fx = Fixture::with_sql(BLOG);
    let post = post(&fx, 10);
    let scope = fx.db.n1_scope();

    for _ in 0..50 {
        post.related(&fx.db, "user").unwrap();
    }

    assert_eq!(scope.stats().total_loads, 50);
    assert_eq!(fx.db.n1_tracker().retained_call_sites(), REPORTED_SITES);
}

model! {
    /// A storage site keyed by a zero-padded text code.
    pub struct Warehouse {
        table: "warehouses",
        fillable: ["code", "city"],
        primary_key: "code",
    }
}

model! {
    pub struct Item {
        table: "items",
        fillable: ["name", "warehouse_code"],
        relationships: [
            RelationshipInfo::belongs_to("warehouse", "warehouses", "warehouse_code", "code"),
        ],
    }
}

const STOCK: &str = "
    CREATE TABLE warehouses (code TEXT PRIMARY KEY, city TEXT);
    CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, warehouse_code TEXT);
    INSERT INTO warehouses (code, city) VALUES ('007', 'Izmir'), ('7', 'Ankara');
    INSERT INTO items (id, name, warehouse_code) VALUES
        (1, 'bolt', '007'),
        (2, 'nut', '7'),
        (3, 'gear', '007');
";

fn city(related: &Related<Row>) -> Option<&str> {
    related.single().and_then(|w| text(w, "city"))
}

#[test]
fn zero_padded_text_keys_match_as_stored() {
    let fx = Fixture::with_sql(STOCK);
    let mark = fx.mark();

    let items = Item::with(&fx.db, ["warehouse"])
        .and_then(|q| q.order_by("id", "ASC"))
        .unwrap()
        .get()
        .unwrap();
    assert_eq!(fx.data_since(mark).len(), 2);

    let cities: Vec<Option<&str>> = items
        .iter()
        .map(|item| item.relation("warehouse").and_then(city))
        .collect();
    assert_eq!(cities, [Some("Izmir"), Some("Ankara"), Some("Izmir")]);

    let bolt = Item::find(&fx.db, 1).unwrap().unwrap();
    let owner = bolt
        .belongs_to::<Warehouse, _>(&fx.db, Some("warehouse_code"))
        .unwrap();
    assert_eq!(
        owner.single().and_then(|w| w.get("code")).and_then(Value::as_str),
        Some("007")
    );
    assert_eq!(city(&bolt.related(&fx.db, "warehouse").unwrap()), Some("Izmir"));

    let nut = Item::find(&fx.db, 2).unwrap().unwrap();
    assert_eq!(city(&nut.related(&fx.db, "warehouse").unwrap()), Some("Ankara"));
}
