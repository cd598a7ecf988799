//! Integration tests for parsing UrbanCode Deploy data.
//!
//! These tests check that the ucd-client models deserialize response bodies
//! captured from a server.

use std::fs;
use std::path::PathBuf;
use ucd_client::models::{
    decode_prop_sheet, json_as_properties, Component, Environment, InventoryRecord,
    PropSheetEntry,
};

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture from disk.
fn load_fixture(name: &str) -> String {
    let fixture_path = fixtures_dir().join(name);
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

#[test]
fn test_deserialize_environment_list() {
    let json_data = load_fixture("application_environments.json");

    let environments: Vec<Environment> = serde_json::from_str(&json_data).unwrap_or_else(|e| {
        panic!(
            "Failed to deserialize environment list: {}\nJSON: {}",
            e, json_data
        )
    });

    assert_eq!(environments.len(), 2, "Expected 2 environments in test data");

    let dev = &environments[0];
    assert_eq!(dev.name, "DEV");
    assert_eq!(dev.color.as_deref(), Some("#00B2EF"));
    assert_eq!(dev.require_approvals, Some(false));
    assert_eq!(dev.active, Some(true));
    // Unmodelled fields are kept
    assert_eq!(dev.extra["historyCleanupDaysToKeep"], 365);

    let prod = &environments[1];
    assert!(prod.description.is_none());
    assert_eq!(prod.require_approvals, Some(true));
}

#[test]
fn test_deserialize_component() {
    let json_data = load_fixture("component.json");
    let component: Component = serde_json::from_str(&json_data).unwrap();

    assert_eq!(component.name, "jpetstore-app");
    assert_eq!(component.created.unwrap().timestamp_millis(), 1_438_808_429_548);

    let role = component.resource_role.as_ref().expect("component has a role");
    assert_eq!(role.id.to_string(), "9d1f2e3a-4b5c-4d6e-8f70-1a2b3c4d5e6f");
    assert_eq!(role.extra["specialType"], "COMPONENT");

    let sheet = component
        .version_prop_sheet_def
        .as_ref()
        .expect("component has a version property sheet");
    assert!(sheet["path"]
        .as_str()
        .unwrap()
        .ends_with("versionPropSheetDef"));

    let properties = json_as_properties(&component.extra);
    assert_eq!(properties["defaultVersionType"], "FULL");
    assert_eq!(properties["useVfs"], "true");
    assert!(!properties.contains_key("tags"));
}

#[test]
fn test_desired_inventory_matching() {
    let json_data = load_fixture("desired_inventory.json");
    let records: Vec<InventoryRecord> = serde_json::from_str(&json_data).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .any(|r| r.matches("jpetstore-app", "1.0", "Active")));
    assert!(records
        .iter()
        .any(|r| r.matches("jpetstore-db", "2.1", "Staged")));
    assert!(!records
        .iter()
        .any(|r| r.matches("jpetstore-db", "2.1", "Active")));
}

#[test]
fn test_role_property_sheet() {
    let json_data = load_fixture("role_properties.json");
    let entries: Vec<PropSheetEntry> = serde_json::from_str(&json_data).unwrap();

    let properties = decode_prop_sheet(&entries).unwrap();
    assert_eq!(properties.len(), 2);
    // Defaults apply only where no value was set
    assert_eq!(properties["port"], "8080");
    assert_eq!(properties["context"], "/petstore");
}
