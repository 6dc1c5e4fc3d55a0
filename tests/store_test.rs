mod helpers;

use invoice_mapper::error::StoreError;
use invoice_mapper::memory::normalize;
use invoice_mapper::memory::store::{JsonFileStore, MappingStore};
use invoice_mapper::memory::types::{ConfirmedMapping, SaveOutcome};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(dir.path().join("confirmed_mappings.json"), "default")
}

#[test]
fn missing_and_blank_files_are_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(store.load("default").unwrap().is_empty());

    std::fs::write(store.path(), "  \n").unwrap();
    assert!(store.load("default").unwrap().is_empty());
    assert!(store.customers().unwrap().is_empty());
}

#[test]
fn confirmed_mapping_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let mapping = ConfirmedMapping::new("bistro", "Roma Tomatoes 10kg", Some("Margherita Pizza".into()));
    assert_eq!(store.save(&mapping).unwrap(), SaveOutcome::Created);

    let reopened = store_in(&dir);
    let found = reopened
        .lookup("bistro", &normalize("roma tomatoes 10KG"))
        .unwrap()
        .unwrap();
    assert_eq!(found.invoice_item, "Roma Tomatoes 10kg");
    assert_eq!(found.target.as_deref(), Some("Margherita Pizza"));
    assert_eq!(found.customer_id, "bistro");
    assert!(!found.confirmed_at.is_empty());
}

#[test]
fn no_match_is_distinct_from_unknown() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store
        .save(&ConfirmedMapping::new("default", "Cleaning Supplies", None))
        .unwrap();

    let no_match = store
        .lookup("default", &normalize("Cleaning Supplies"))
        .unwrap()
        .unwrap();
    assert!(no_match.is_no_match());
    assert!(store
        .lookup("default", &normalize("Paper Towels"))
        .unwrap()
        .is_none());

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert!(raw["default"]["cleaning supplies"]["target"].is_null());
}

#[test]
fn confirming_twice_equals_once() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let first = ConfirmedMapping::new("default", "Fresh Basil", Some("Pesto Pasta".into()));
    store.save(&first).unwrap();
    let before = std::fs::read_to_string(store.path()).unwrap();

    let again = ConfirmedMapping::new("default", "fresh basil", Some("Pesto Pasta".into()));
    assert_eq!(store.save(&again).unwrap(), SaveOutcome::Unchanged);
    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    assert_eq!(store.load("default").unwrap().len(), 1);

    let changed = ConfirmedMapping::new("default", "Fresh Basil", Some("Margherita Pizza".into()));
    assert_eq!(store.save(&changed).unwrap(), SaveOutcome::Updated);
    let entry = store
        .lookup("default", "fresh basil")
        .unwrap()
        .unwrap();
    assert_eq!(entry.target.as_deref(), Some("Margherita Pizza"));
}

#[test]
fn customers_do_not_share_mappings() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store
        .save(&ConfirmedMapping::new("bistro", "Fresh Basil", Some("Pesto Pasta".into())))
        .unwrap();
    store
        .save(&ConfirmedMapping::new("cafe", "Fresh Basil", None))
        .unwrap();

    assert_eq!(
        store.lookup("bistro", "fresh basil").unwrap().unwrap().target.as_deref(),
        Some("Pesto Pasta")
    );
    assert!(store.lookup("cafe", "fresh basil").unwrap().unwrap().is_no_match());
    assert!(store.lookup("default", "fresh basil").unwrap().is_none());
    assert_eq!(store.customers().unwrap(), vec!["bistro", "cafe"]);
}

#[test]
fn remove_deletes_only_that_item() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store
        .save(&ConfirmedMapping::new("default", "Fresh Basil", Some("Pesto Pasta".into())))
        .unwrap();
    store
        .save(&ConfirmedMapping::new("default", "Tomatoes", Some("Margherita Pizza".into())))
        .unwrap();

    assert!(store.remove("default", "fresh basil").unwrap());
    assert!(!store.remove("default", "fresh basil").unwrap());
    let left = store.load("default").unwrap();
    assert_eq!(left.len(), 1);
    assert!(left.contains_key("tomatoes"));
}

#[test]
fn legacy_flat_file_is_read_and_upgraded_on_write() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(
        store.path(),
        r#"{"Roma Tomatoes 10kg": "Margherita Pizza", "Cleaning Supplies": null}"#,
    )
    .unwrap();

    let memory = store.load("default").unwrap();
    assert_eq!(memory.len(), 2);
    assert_eq!(
        memory["roma tomatoes 10kg"].target.as_deref(),
        Some("Margherita Pizza")
    );
    assert!(memory["cleaning supplies"].target.is_none());

    store
        .save(&ConfirmedMapping::new("default", "Fresh Basil", Some("Pesto Pasta".into())))
        .unwrap();
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["default"].as_object().unwrap().len(), 3);
    assert_eq!(
        raw["default"]["roma tomatoes 10kg"]["invoice_item"],
        "Roma Tomatoes 10kg"
    );
}

#[test]
fn corrupt_file_fails_reads_and_is_moved_aside_on_write() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{ this is not json").unwrap();

    assert!(matches!(
        store.load("default").unwrap_err(),
        StoreError::Corrupt { .. }
    ));

    store
        .save(&ConfirmedMapping::new("default", "Fresh Basil", Some("Pesto Pasta".into())))
        .unwrap();
    assert_eq!(store.load("default").unwrap().len(), 1);

    let backups: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("confirmed_mappings.json.corrupt-"))
        .collect();
    assert_eq!(backups.len(), 1);
    let backup = std::fs::read_to_string(dir.path().join(&backups[0])).unwrap();
    assert_eq!(backup, "{ this is not json");
}
