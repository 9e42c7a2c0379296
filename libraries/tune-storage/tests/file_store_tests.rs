//! Integration tests for the JSON file store

use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tune_core::{load_state, save_state, StateStore, TuneError};
use tune_storage::JsonFileStore;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    tracks: Vec<String>,
    current_index: Option<usize>,
}

fn setup() -> (TempDir, JsonFileStore) {
    let dir = TempDir::new().expect("temp dir");
    let store = JsonFileStore::open(dir.path().join("state")).expect("open store");
    (dir, store)
}

#[test]
fn missing_namespace_loads_as_none() {
    let (_dir, store) = setup();
    let loaded: Option<Snapshot> = load_state(&store, "tune-player-queue").unwrap();
    assert!(loaded.is_none());
}

#[test]
fn typed_round_trip() {
    let (_dir, store) = setup();
    let snapshot = Snapshot {
        tracks: vec!["a".into(), "b".into()],
        current_index: Some(1),
    };

    save_state(&store, "tune-player-queue", &snapshot).unwrap();
    let loaded: Option<Snapshot> = load_state(&store, "tune-player-queue").unwrap();
    assert_eq!(loaded, Some(snapshot));
}

#[test]
fn survives_reopen() {
    let (dir, store) = setup();
    store.save_raw("tune-player-config", "{\"crossfade_ms\":2500}").unwrap();
    drop(store);

    let reopened = JsonFileStore::open(dir.path().join("state")).unwrap();
    assert_eq!(
        reopened.load_raw("tune-player-config").unwrap().as_deref(),
        Some("{\"crossfade_ms\":2500}")
    );
}

fn file_names(store: &JsonFileStore) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(store.root())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn overwrite_replaces_document_and_leaves_no_temp_file() {
    let (_dir, store) = setup();
    store.save_raw("ns", "[1]").unwrap();
    store.save_raw("ns", "[2]").unwrap();

    assert_eq!(store.load_raw("ns").unwrap().as_deref(), Some("[2]"));
    assert_eq!(file_names(&store), vec!["ns.json".to_string()]);
}

#[test]
fn failed_write_cleans_up_its_temp_file() {
    let (_dir, store) = setup();
    // A directory where the document should go makes the final rename fail
    std::fs::create_dir(store.root().join("blocked.json")).unwrap();

    assert!(store.save_raw("blocked", "{}").is_err());
    assert_eq!(file_names(&store), vec!["blocked.json".to_string()]);
}

#[test]
fn namespaces_are_independent() {
    let (_dir, store) = setup();
    store.save_raw("tune-player-queue", "[]").unwrap();
    store.save_raw("tune-player-config", "{}").unwrap();

    store.remove("tune-player-queue").unwrap();
    assert_eq!(store.load_raw("tune-player-queue").unwrap(), None);
    assert_eq!(store.load_raw("tune-player-config").unwrap().as_deref(), Some("{}"));
}

#[test]
fn path_traversal_namespace_rejected() {
    let (_dir, store) = setup();
    let err = store.save_raw("../escape", "{}").unwrap_err();
    assert!(matches!(err, TuneError::Storage(_)));
    assert!(store.load_raw("").is_err());
}

#[test]
fn corrupt_document_is_an_error_not_a_panic() {
    let (_dir, store) = setup();
    std::fs::write(store.root().join("ns.json"), "{not json").unwrap();
    assert!(store.load_raw("ns").is_err());
}
