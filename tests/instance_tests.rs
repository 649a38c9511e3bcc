//! Tests for instance control and locking.

use modrun::error::Error;
use modrun::instance::{self, InstanceControl, InstanceProperties};
use modrun::lockfile::LockFile;
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Locking Tests
// =============================================================================

#[test]
fn test_lock_exclusion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("instance.lock");

    let _holder = LockFile::acquire(&path).unwrap();
    assert!(matches!(
        LockFile::acquire(&path),
        Err(Error::InstanceBusy(_))
    ));
}

#[test]
fn test_lock_released_on_drop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("instance.lock");

    drop(LockFile::acquire(&path).unwrap());
    let _second = LockFile::acquire(&path).unwrap();
}

#[test]
fn test_concurrent_instance_control_refused() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("instance");

    let _holder = InstanceControl::open(&location).unwrap();

    match InstanceControl::open(&location) {
        Err(Error::InstanceBusy(_)) => {}
        other => panic!("expected a busy instance, got {other:?}"),
    }
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_open_creates_instance_layout() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("deep/instance");

    let control = InstanceControl::open(&location).unwrap();

    assert!(control.acquired());
    assert!(location.join("etc").is_dir());
    assert!(instance::seems_valid(&location));
}

#[test]
fn test_validity_requires_etc() {
    let dir = TempDir::new().unwrap();
    let plain = dir.path().join("plain");
    fs::create_dir_all(&plain).unwrap();

    assert!(!instance::seems_valid(&plain));
}

// =============================================================================
// Property Persistence Tests
// =============================================================================

#[test]
fn test_properties_persisted_under_etc() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("instance");
    let control = InstanceControl::open(&location).unwrap();

    let effective = InstanceProperties {
        system: map(&[("sys", "1")]),
        launching: map(&[("shutdown.timeout", "5s")]),
        framework: map(&[("container.option", "x")]),
    };
    control.store_properties(&effective).unwrap();

    for name in [
        "framework.properties",
        "launching.properties",
        "system.properties",
    ] {
        assert!(location.join("etc").join(name).is_file(), "{name} missing");
    }
}

#[test]
fn test_restore_does_not_override_existing() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("instance");

    {
        let control = InstanceControl::open(&location).unwrap();
        let stored = InstanceProperties {
            launching: map(&[("shutdown.timeout", "5s"), ("other", "stored")]),
            ..Default::default()
        };
        control.store_properties(&stored).unwrap();
    }

    let mut restored = InstanceProperties {
        launching: map(&[("shutdown.timeout", "90s")]),
        ..Default::default()
    };
    instance::restore_properties(&location, &mut restored).unwrap();

    assert_eq!(restored.launching.get("shutdown.timeout").unwrap(), "90s");
    assert_eq!(restored.launching.get("other").unwrap(), "stored");
}

// =============================================================================
// Deletion Tests
// =============================================================================

#[test]
fn test_delete_removes_instance_completely() {
    let dir = TempDir::new().unwrap();
    let location = dir.path().join("instance");

    {
        let control = InstanceControl::open(&location).unwrap();
        control
            .store_properties(&InstanceProperties::default())
            .unwrap();
        fs::create_dir_all(location.join("data")).unwrap();
        fs::write(location.join("data/unit"), "bytes").unwrap();
    }

    assert!(InstanceControl::delete(&location).unwrap());
    assert!(!location.exists());
}

#[test]
fn test_delete_missing_instance_reports_false() {
    let dir = TempDir::new().unwrap();
    assert!(!InstanceControl::delete(&dir.path().join("missing")).unwrap());
}

#[test]
fn test_delete_refuses_non_instance() {
    let dir = TempDir::new().unwrap();
    let foreign = dir.path().join("foreign");
    fs::create_dir_all(&foreign).unwrap();
    fs::write(foreign.join("precious"), "data").unwrap();

    assert!(InstanceControl::delete(&foreign).is_err());
    assert!(foreign.join("precious").exists());
}
