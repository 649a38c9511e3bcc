//! Tests for the properties and interpolation layer.

use modrun::interpolate::interpolate;
use modrun::properties::{self, PropertiesFile};
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
// Property File Tests
// =============================================================================

#[test]
fn test_save_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("test.properties");

    let data = map(&[
        ("simple", "value"),
        ("spaced key", "spaced value"),
        ("escaped", "tab\tand\nnewline"),
        ("url", "https://example.org/path?q=1"),
    ]);

    properties::save(&data, &file).unwrap();
    let loaded = PropertiesFile::required(&file).load().unwrap();

    assert_eq!(loaded, data);
}

#[test]
fn test_save_is_sorted_without_timestamp() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("test.properties");

    properties::save(&map(&[("b", "2"), ("a", "1")]), &file).unwrap();

    let text = fs::read_to_string(&file).unwrap();
    assert_eq!(text, "a=1\nb=2\n");
}

#[test]
fn test_load_accepts_common_syntax() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("test.properties");

    fs::write(
        &file,
        "# comment\n\
         key = value\n\
         colon:separated\n\
         continued = one \\\n    two\n",
    )
    .unwrap();

    let loaded = PropertiesFile::required(&file).load().unwrap();
    assert_eq!(
        loaded,
        map(&[
            ("key", "value"),
            ("colon", "separated"),
            ("continued", "one two"),
        ])
    );
}

#[test]
fn test_missing_optional_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let loaded = PropertiesFile::optional(dir.path().join("missing.properties"))
        .load()
        .unwrap();
    assert!(loaded.is_empty());
}

#[test]
fn test_missing_required_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = PropertiesFile::required(dir.path().join("missing.properties")).load();
    assert!(result.is_err());
}

#[test]
fn test_restore_keeps_existing_entries() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("stored.properties");
    properties::save(&map(&[("kept", "stored"), ("filled", "stored")]), &file).unwrap();

    let mut result = map(&[("kept", "explicit")]);
    PropertiesFile::optional(&file).restore_into(&mut result).unwrap();

    assert_eq!(result.get("kept").unwrap(), "explicit");
    assert_eq!(result.get("filled").unwrap(), "stored");
}

#[test]
fn test_merge_overwrites_existing_entries() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("stored.properties");
    properties::save(&map(&[("key", "file")]), &file).unwrap();

    let mut result = map(&[("key", "old")]);
    PropertiesFile::required(&file).merge_into(&mut result).unwrap();

    assert_eq!(result.get("key").unwrap(), "file");
}

// =============================================================================
// Interpolation Tests
// =============================================================================

#[test]
fn test_interpolation_replaces_known() {
    let values = map(&[("name", "value")]);
    let resolved = interpolate("before ${name} after", |key| values.get(key).cloned());
    assert_eq!(resolved, "before value after");
}

#[test]
fn test_interpolation_keeps_unknown_textually_intact() {
    let resolved = interpolate("${unknown} stays", |_| None);
    assert_eq!(resolved, "${unknown} stays");
}

#[test]
fn test_interpolation_idempotent_without_placeholders() {
    let plain = "no placeholders here $ { }";
    assert_eq!(interpolate(plain, |_| None), plain);
}

#[test]
fn test_interpolation_is_single_pass() {
    let values = map(&[("a", "${b}"), ("b", "never")]);
    let resolved = interpolate("${a}", |key| values.get(key).cloned());
    assert_eq!(resolved, "${b}");
}
