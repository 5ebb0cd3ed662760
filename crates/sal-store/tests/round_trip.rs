//! Persistence round-trip properties for the handle store.

use proptest::prelude::*;
use sal_store::{AnchorHandle, JsonFileStore, KeyValueStore, MemoryStore, PersistentHandleStore};
use std::sync::Arc;

fn handle_vec() -> impl Strategy<Value = Vec<AnchorHandle>> {
    prop::collection::vec(any::<String>().prop_map(AnchorHandle::new), 0..16)
}

proptest! {
    #[test]
    fn prop_save_then_load_is_identity(handles in handle_vec()) {
        let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
        store.save(&handles).unwrap();
        prop_assert_eq!(store.load(), handles);
    }

    #[test]
    fn prop_last_save_wins(first in handle_vec(), second in handle_vec()) {
        let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
        store.save(&first).unwrap();
        store.save(&second).unwrap();
        prop_assert_eq!(store.load(), second);
    }
}

#[test]
fn empty_sequence_round_trips() {
    let store = PersistentHandleStore::new(Arc::new(MemoryStore::new()));
    store.save(&[]).unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn file_backend_round_trips_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    let handles = vec![AnchorHandle::new("3f1c"), AnchorHandle::new("9ab0")];

    {
        let store = PersistentHandleStore::new(Arc::new(JsonFileStore::new(&path)));
        store.save(&handles).unwrap();
    }

    let reopened = PersistentHandleStore::new(Arc::new(JsonFileStore::new(&path)));
    assert_eq!(reopened.load(), handles);
}

#[test]
fn file_backend_keeps_unrelated_keys() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(JsonFileStore::new(dir.path().join("local-storage.json")));
    backend.set("theme", "dark".to_string()).unwrap();

    let store = PersistentHandleStore::new(backend.clone());
    store.save(&[AnchorHandle::new("a")]).unwrap();

    assert_eq!(backend.get("theme").unwrap().as_deref(), Some("dark"));
}
