//! UnifiedStorage over a FileStore
//!
//! Exercises the cache against a store that outlives the storage instance.

use planboard_storage::{FileStore, KeyValueStore, UnifiedStorage};
use serde_json::{json, Value};
use std::sync::Arc;

#[test]
fn test_collections_persist_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planboard.json");

    {
        let storage = UnifiedStorage::new(Arc::new(FileStore::open(&path).unwrap()));
        storage.add_item("trips", &json!({"id": "t1", "name": "Spring"})).unwrap();
        storage.add_item("trips", &json!({"id": "t2", "name": "Fall"})).unwrap();
        storage.update_item("trips", "t2", &json!({"name": "Autumn"})).unwrap();
    }

    let storage = UnifiedStorage::new(Arc::new(FileStore::open(&path).unwrap()));
    let trips: Vec<Value> = storage.get_collection("trips");
    assert_eq!(
        trips,
        vec![
            json!({"id": "t1", "name": "Spring"}),
            json!({"id": "t2", "name": "Autumn"}),
        ]
    );
}

#[test]
fn test_garbage_under_collection_key_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path().join("s.json")).unwrap());
    let storage = UnifiedStorage::with_prefix(store.clone(), "");

    store.set("trips", "<html>oops</html>").unwrap();
    let trips: Vec<Value> = storage.get_collection("trips");
    assert!(trips.is_empty());

    // Writing after corruption replaces the garbage
    storage.add_item("trips", &json!({"id": "t1"})).unwrap();
    assert_eq!(store.get("trips").unwrap().as_deref(), Some(r#"[{"id":"t1"}]"#));
}
