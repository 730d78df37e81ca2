//! Behaviour of the store as seen through the fluent query surface.

use papyrus::{DeleteOutcome, PapyrusError, QueryResult, Store};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

fn open_store(config: &str) -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("papyrus.yaml"), config).unwrap();
    let store = Store::open(tmp.path()).unwrap();
    (tmp, store)
}

fn users_store() -> (TempDir, Store) {
    open_store("files:\n  users: ['dni(int#)', name, lastName]\n")
}

fn notes_store() -> (TempDir, Store) {
    open_store("files:\n  notes: ['id(int++)', title, body]\n")
}

fn on_disk(tmp: &TempDir, file: &str) -> Value {
    let content = std::fs::read_to_string(tmp.path().join(format!("{file}.data"))).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn insert(store: &Store, file: &str, payload: Value) -> QueryResult {
    store.query().insert_into(file).values(payload).execute().unwrap()
}

#[test]
fn users_scenario() {
    let (tmp, store) = users_store();

    let first = insert(&store, "users", json!({"dni": 1, "name": "Ana", "lastName": "Ruiz"}));
    assert!(first.succeeded());

    let second = insert(&store, "users", json!({"dni": 1, "name": "X"}));
    assert!(!second.succeeded());
    assert_eq!(
        on_disk(&tmp, "users"),
        json!([{"dni": 1, "name": "Ana", "lastName": "Ruiz"}])
    );

    let fetched = store
        .query()
        .select(["name"])
        .from("users")
        .where_eq("dni", 1)
        .execute()
        .unwrap();
    assert_eq!(fetched.to_json(), json!({"name": "Ana"}));
}

#[test]
fn auto_increment_keys_follow_insertion_order() {
    let (_tmp, store) = notes_store();
    for i in 0..5 {
        insert(&store, "notes", json!({"title": format!("note {i}")}));
    }

    let ids: Vec<Value> = store
        .query()
        .from("notes")
        .execute()
        .unwrap()
        .records()
        .iter()
        .map(|r| r["id"].clone())
        .collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
}

#[test]
fn deleting_the_last_auto_increment_key_makes_it_reusable() {
    let (_tmp, store) = notes_store();
    for title in ["a", "b", "c"] {
        insert(&store, "notes", json!({"title": title}));
    }

    store.query().delete_from("notes").where_eq("id", 3).execute().unwrap();
    let reinserted = insert(&store, "notes", json!({"title": "d"}));

    assert_eq!(reinserted.record().unwrap()["id"], json!(3));
}

#[test]
fn keyed_update_ignores_empty_values() {
    let (tmp, store) = users_store();
    insert(&store, "users", json!({"dni": 7, "name": "Ana", "lastName": "Ruiz"}));

    for empty in [json!(0), json!(false), json!(""), json!(null)] {
        let result = store
            .query()
            .update("users")
            .set(json!({"name": empty, "lastName": "Gil"}))
            .where_eq("dni", 7)
            .execute()
            .unwrap();
        assert!(result.succeeded());
    }

    assert_eq!(
        on_disk(&tmp, "users"),
        json!([{"dni": 7, "name": "Ana", "lastName": "Gil"}])
    );
}

#[test]
fn bulk_update_overwrites_every_record() {
    let (tmp, store) = open_store("files:\n  tags: ['slug(str#)', label]\n");
    for slug in ["rust", "go", "zig"] {
        insert(&store, "tags", json!({"slug": slug, "label": slug.to_uppercase()}));
    }

    let result = store
        .query()
        .update("tags")
        .set(json!({"label": null}))
        .execute()
        .unwrap();
    assert_eq!(result.to_json(), json!({"ok": true, "matched": 3}));
    assert!(on_disk(&tmp, "tags")
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["label"].is_null()));

    let err = store
        .query()
        .update("tags")
        .set(json!({"slug": "all"}))
        .execute()
        .unwrap_err();
    assert!(matches!(err, PapyrusError::Validation(_)));
}

#[test]
fn keyed_delete_preserves_order_of_the_rest() {
    let (tmp, store) = users_store();
    for (dni, name) in [(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
        insert(&store, "users", json!({"dni": dni, "name": name}));
    }

    let result = store.query().delete_from("users").where_eq("dni", 2).execute().unwrap();
    assert_eq!(result, QueryResult::Deleted(DeleteOutcome::Removed(1)));

    let names: Vec<Value> = on_disk(&tmp, "users")
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("a"), json!("c"), json!("d")]);
}

#[test]
fn limited_ascending_fetch_returns_smallest_values_case_insensitively() {
    let (_tmp, store) = users_store();
    for (dni, name) in [(1, "delta"), (2, "Bravo"), (3, "alpha"), (4, "Charlie")] {
        insert(&store, "users", json!({"dni": dni, "name": name}));
    }

    let result = store
        .query()
        .select(["name"])
        .from("users")
        .order_by("name", "ASC")
        .limit(2)
        .execute()
        .unwrap();

    assert_eq!(result.to_json(), json!([{"name": "alpha"}, {"name": "Bravo"}]));
}

#[test]
fn projection_keeps_exactly_the_selected_fields() {
    let (_tmp, store) = users_store();
    insert(&store, "users", json!({"dni": 1, "name": "Ana", "lastName": "Ruiz"}));
    insert(&store, "users", json!({"dni": 2, "name": "Bea"}));

    let result = store
        .query()
        .select(["name", " lastName "])
        .from("users")
        .execute()
        .unwrap();

    for record in result.records() {
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "lastName"]);
    }
}

#[test]
fn rejected_calls_never_touch_the_file() {
    let (tmp, store) = users_store();
    insert(&store, "users", json!({"dni": 1, "name": "Ana"}));
    let before = on_disk(&tmp, "users");

    let err = store
        .query()
        .update("users")
        .set(json!({"name": {"nested": true}}))
        .where_eq("dni", 1)
        .execute()
        .unwrap_err();
    assert!(matches!(err, PapyrusError::Validation(_)));

    let err = store
        .query()
        .from("users")
        .order_by("name", "sideways")
        .execute()
        .unwrap_err();
    assert!(err.is_rejection());

    let err = store
        .query()
        .delete_from("users")
        .condition(json!({"dni": 1, "name": "Ana"}))
        .execute()
        .unwrap_err();
    assert!(matches!(err, PapyrusError::Validation(_)));

    let err = store
        .query()
        .delete_from("users")
        .where_eq("name", "Ana")
        .execute()
        .unwrap_err();
    assert!(matches!(err, PapyrusError::Validation(_)));

    let err = store
        .query()
        .insert_into("ghosts")
        .values(json!({"dni": 2}))
        .execute()
        .unwrap_err();
    assert!(matches!(err, PapyrusError::Configuration(_)));

    assert_eq!(on_disk(&tmp, "users"), before);
}

#[test]
fn keyed_fetch_miss_is_empty_not_an_error() {
    let (_tmp, store) = users_store();
    let result = store.query().from("users").where_eq("dni", 42).execute().unwrap();

    assert!(result.records().is_empty());
    assert_eq!(result.to_json(), Value::Null);
}

#[test]
fn unconditioned_delete_truncates() {
    let (tmp, store) = users_store();
    insert(&store, "users", json!({"dni": 1, "name": "Ana"}));

    let result = store.query().delete_from("users").execute().unwrap();

    assert_eq!(result, QueryResult::Deleted(DeleteOutcome::Truncated));
    assert_eq!(on_disk(&tmp, "users"), json!([]));
}
