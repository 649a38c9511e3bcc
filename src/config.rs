//! Command configuration.

use crate::constants::{PROPERTY_CONTAINER_STORAGE, PROPERTY_SHUTDOWN_TIMEOUT};
use crate::error::{Error, Result};
use crate::fsutil;
use crate::instance::InstanceProperties;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// A provider of bundle source directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSource {
    /// A single source: the directory itself, or a properties file whose
    /// parent directory is the source.
    Source(PathBuf),
    /// A store: a directory whose direct subdirectories are each a source,
    /// processed in sorted order.
    Store(PathBuf),
}

impl BundleSource {
    /// Resolves the provider into the source paths.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        match self {
            BundleSource::Source(path) => Ok(vec![fsutil::normalize(path)]),
            BundleSource::Store(root) => {
                let listing = fs::read_dir(root).map_err(|e| {
                    Error::Config(format!("could not list bundle store {}: {e}", root.display()))
                })?;

                let mut result = Vec::new();
                for entry in listing {
                    let entry = entry.map_err(|e| {
                        Error::Config(format!(
                            "could not list bundle store {}: {e}",
                            root.display()
                        ))
                    })?;

                    let path = entry.path();
                    if path.is_dir() {
                        result.push(fsutil::normalize(&path));
                    }
                }

                result.sort();
                Ok(result)
            }
        }
    }
}

/// Holds the complete configuration for deploying and starting an
/// instance.
#[derive(Debug, Default)]
pub struct Configuration {
    /// The effective system, launching and framework properties.
    pub properties: InstanceProperties,
    /// The address to receive commands at, if the feature is enabled.
    pub command_address: Option<(String, u16)>,
    /// The command link secret; empty means a random one gets generated.
    pub command_secret: String,
    /// The bundle sources to deploy from, in order.
    pub bundles: Vec<BundleSource>,
    /// Directories copied into `conf/` only when it does not exist yet.
    pub create_configuration: Vec<PathBuf>,
    /// Directories always overlaid onto `conf/`.
    pub update_configuration: Vec<PathBuf>,
    /// Restricted globs selecting bundle locations to uninstall.
    pub uninstall_bundles: Vec<String>,
    /// Remaining positional parameters after the instance path.
    pub parameters: Vec<String>,
    /// The instance path.
    pub instance: PathBuf,
    /// Wipe the whole instance (except the lock) before deploying.
    pub clean_instance: bool,
    /// Wipe the configuration tree before deploying.
    pub clean_configuration: bool,
    /// Print the detailed status.
    pub dump_status: bool,
    /// Skip the deploy phase of a launch.
    pub skip_deploy: bool,
    /// Skip the start phase of a launch.
    pub skip_start: bool,
}

impl Configuration {
    /// Creates a blank configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration after parsing and normalizes it.
    pub fn validate(&mut self) -> Result<()> {
        if self.instance.as_os_str().is_empty() {
            return Err(Error::Config("missing instance path".to_string()));
        }

        self.instance = fsutil::normalize(&self.instance);

        // The storage location is derived from the instance and may not be
        // redirected through the supplied properties
        self.properties.framework.remove(PROPERTY_CONTAINER_STORAGE);

        self.shutdown_timeout()?;
        Ok(())
    }

    /// Returns the shutdown timeout from the launching properties, `None`
    /// meaning waiting forever.
    pub fn shutdown_timeout(&self) -> Result<Option<Duration>> {
        let Some(value) = self.properties.launching.get(PROPERTY_SHUTDOWN_TIMEOUT) else {
            return Ok(None);
        };

        parse_timeout(value)
    }
}

/// Parses a shutdown timeout value.
///
/// Accepts the ISO-8601 duration format or `N UNIT` with unit `m`, `s` or
/// `ms`; `none`, `null` and an empty value mean waiting forever. Zero is
/// not allowed.
pub fn parse_timeout(value: &str) -> Result<Option<Duration>> {
    let value = value.trim();
    if value.is_empty() || value == "none" || value == "null" {
        return Ok(None);
    }

    let result = parse_iso8601(value)
        .or_else(|| parse_unit_value(value))
        .ok_or_else(|| Error::Config(format!("could not parse shutdown timeout: {value}")))?;

    if result.is_zero() {
        return Err(Error::Config(
            "zero shutdown timeout not allowed".to_string(),
        ));
    }

    Ok(Some(result))
}

/// Parses the supported subset of ISO-8601 durations: `PnDTnHnMn.nS` with
/// every element optional, case-insensitive.
fn parse_iso8601(value: &str) -> Option<Duration> {
    let text = value.to_ascii_uppercase();
    let rest = text.strip_prefix('P')?;
    let (days_part, time_part) = match rest.split_once('T') {
        Some((days, time)) => (days, Some(time)),
        None => (rest, None),
    };

    let mut millis = 0u64;
    let mut seen = false;

    let mut days_scan = days_part;
    if let Some((number, rest)) = scan_number(days_scan, 'D') {
        millis += number * 24 * 60 * 60 * 1000;
        seen = true;
        days_scan = rest;
    }
    if !days_scan.is_empty() {
        return None;
    }

    if let Some(time) = time_part {
        let mut scan = time;
        if let Some((number, rest)) = scan_number(scan, 'H') {
            millis += number * 60 * 60 * 1000;
            seen = true;
            scan = rest;
        }
        if let Some((number, rest)) = scan_number(scan, 'M') {
            millis += number * 60 * 1000;
            seen = true;
            scan = rest;
        }
        if let Some((seconds, rest)) = scan_seconds(scan) {
            millis += seconds;
            seen = true;
            scan = rest;
        }
        if !scan.is_empty() {
            return None;
        }
    }

    seen.then(|| Duration::from_millis(millis))
}

/// Scans a leading `<digits><marker>` element.
fn scan_number(text: &str, marker: char) -> Option<(u64, &str)> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let rest = &text[digits.len()..];
    let rest = rest.strip_prefix(marker)?;
    Some((digits.parse().ok()?, rest))
}

/// Scans a leading `<digits>[.<fraction>]S` element into milliseconds.
fn scan_seconds(text: &str) -> Option<(u64, &str)> {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let mut rest = &text[digits.len()..];
    let mut millis: u64 = digits.parse::<u64>().ok()? * 1000;

    if let Some(fraction_text) = rest.strip_prefix('.') {
        let fraction: String = fraction_text
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        if fraction.is_empty() {
            return None;
        }

        let scaled: String = format!("{fraction:0<3}").chars().take(3).collect();
        millis += scaled.parse::<u64>().ok()?;
        rest = &fraction_text[fraction.len()..];
    }

    let rest = rest.strip_prefix('S')?;
    Some((millis, rest))
}

/// Parses the `N UNIT` form with unit `m`, `s` or `ms`.
fn parse_unit_value(value: &str) -> Option<Duration> {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }

    let number: u64 = digits.parse().ok()?;
    match value[digits.len()..].trim_start() {
        "m" => Some(Duration::from_secs(number * 60)),
        "s" => Some(Duration::from_secs(number)),
        "ms" => Some(Duration::from_millis(number)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_disabled_forms() {
        assert_eq!(parse_timeout("none").unwrap(), None);
        assert_eq!(parse_timeout("null").unwrap(), None);
        assert_eq!(parse_timeout("").unwrap(), None);
    }

    #[test]
    fn test_timeout_unit_forms() {
        assert_eq!(parse_timeout("5s").unwrap(), Some(Duration::from_secs(5)));
        assert_eq!(parse_timeout("2 m").unwrap(), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_timeout("250ms").unwrap(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_timeout_iso8601_forms() {
        assert_eq!(parse_timeout("PT5S").unwrap(), Some(Duration::from_secs(5)));
        assert_eq!(
            parse_timeout("PT1M30S").unwrap(),
            Some(Duration::from_secs(90))
        );
        assert_eq!(
            parse_timeout("PT0.5S").unwrap(),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            parse_timeout("P1DT1H").unwrap(),
            Some(Duration::from_secs(25 * 60 * 60))
        );
    }

    #[test]
    fn test_timeout_rejects_garbage_and_zero() {
        assert!(parse_timeout("soon").is_err());
        assert!(parse_timeout("5 h").is_err());
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("PT0S").is_err());
    }

    #[test]
    fn test_validate_requires_instance() {
        let mut configuration = Configuration::new();
        assert!(configuration.validate().is_err());

        configuration.instance = PathBuf::from("./instance/.");
        configuration.validate().unwrap();
        assert_eq!(configuration.instance, PathBuf::from("instance"));
    }

    #[test]
    fn test_validate_strips_storage_override() {
        let mut configuration = Configuration::new();
        configuration.instance = PathBuf::from("instance");
        configuration
            .properties
            .framework
            .insert(PROPERTY_CONTAINER_STORAGE.to_string(), "/tmp/x".to_string());

        configuration.validate().unwrap();
        assert!(
            !configuration
                .properties
                .framework
                .contains_key(PROPERTY_CONTAINER_STORAGE)
        );
    }
}
