//! End-to-end workflow tests.

use ntest::timeout;
use serde_json::json;
use tempfile::tempdir;

use velox_core::{Database, DbError};

use super::helpers::{dump, fast_config};

/// Table creation, id allocation, and id retirement through the database.
#[timeout(1000)]
#[test]
fn test_users_scenario() {
    let db = Database::with_config(fast_config());
    db.create_table("users").unwrap();
    assert!(matches!(
        db.create_table("users"),
        Err(DbError::TableAlreadyExists(_))
    ));

    let users = db.get_table("users").unwrap();
    assert_eq!(users.create(json!({"name": "a"})).unwrap(), 1);
    assert_eq!(users.create(json!({"name": "b"})).unwrap(), 2);
    users.delete(1).unwrap();
    assert_eq!(users.create(json!({"name": "c"})).unwrap(), 3);

    assert!(users.read(1).unwrap_err().is_not_found());
    assert_eq!(users.read(3).unwrap(), json!({"name": "c"}));
}

/// Full CRUD lifecycle: create table → add records → read → update → delete
#[timeout(2000)]
#[test]
fn test_full_crud_lifecycle() {
    let db = Database::with_config(fast_config());
    db.create_table("products").unwrap();
    let products = db.get_table("products").unwrap();

    for i in 1..=100u64 {
        let id = products
            .create(json!({"name": format!("Product {}", i), "price": i * 10}))
            .unwrap();
        assert_eq!(id, i);
    }
    assert_eq!(products.len().unwrap(), 100);

    for id in (2..=100).step_by(2) {
        products
            .update(id, json!({"name": format!("Product {}", id), "on_sale": true}))
            .unwrap();
    }
    assert_eq!(
        products.read(50).unwrap(),
        json!({"name": "Product 50", "on_sale": true})
    );
    assert_eq!(
        products.read(51).unwrap(),
        json!({"name": "Product 51", "price": 510})
    );

    for id in 1..=50 {
        products.delete(id).unwrap();
    }
    assert_eq!(products.len().unwrap(), 50);
    assert_eq!(products.ids().unwrap(), (51..=100).collect::<Vec<u64>>());
    assert_eq!(products.create(json!({})).unwrap(), 101);
}

/// Save → load into a fresh database reproduces every table.
#[timeout(2000)]
#[test]
fn test_save_load_round_trip() {
    let temp_dir = tempdir().unwrap();

    let db = Database::with_config(fast_config());
    db.create_table("users").unwrap();
    db.create_table("orders").unwrap();
    db.create_table("audit").unwrap();

    let users = db.get_table("users").unwrap();
    for name in ["ann", "bob", "cid", "dee"] {
        users.create(json!({"name": name, "roles": ["reader"]})).unwrap();
    }
    users.delete(4).unwrap();
    users.update(2, json!({"name": "bob", "roles": []})).unwrap();

    let orders = db.get_table("orders").unwrap();
    orders.create(json!(12.5)).unwrap();
    orders.create(json!(null)).unwrap();
    orders.create(json!("pending")).unwrap();
    orders.delete(1).unwrap();

    db.save_to(temp_dir.path()).unwrap();

    let restored = Database::with_config(fast_config());
    restored.load(temp_dir.path()).unwrap();

    assert_eq!(dump(&restored), dump(&db));
    assert_eq!(restored.table_names(), vec!["audit", "orders", "users"]);
    assert_eq!(restored.folder(), temp_dir.path());

    for name in restored.table_names() {
        let table = restored.get_table(&name).unwrap();
        let max_id = table.ids().unwrap().into_iter().max().unwrap_or(0);
        assert!(table.current_next_id().unwrap() > max_id);
    }

    // Restored ids are never reissued
    let users = restored.get_table("users").unwrap();
    assert_eq!(users.create(json!({"name": "eve"})).unwrap(), 4);
}

/// Load → mutate → save writes back into the loaded directory.
#[timeout(2000)]
#[test]
fn test_save_targets_loaded_folder() {
    let temp_dir = tempdir().unwrap();

    let seed = Database::with_config(fast_config());
    seed.create_table("notes").unwrap();
    seed.get_table("notes").unwrap().create(json!("first")).unwrap();
    seed.save_to(temp_dir.path()).unwrap();

    let db = Database::with_config(fast_config());
    db.load(temp_dir.path()).unwrap();
    db.get_table("notes").unwrap().create(json!("second")).unwrap();
    db.create_table("tags").unwrap();
    db.save().unwrap();

    let reloaded = Database::with_config(fast_config());
    reloaded.load(temp_dir.path()).unwrap();
    assert_eq!(dump(&reloaded), dump(&db));
    assert_eq!(reloaded.get_table("notes").unwrap().len().unwrap(), 2);
}
