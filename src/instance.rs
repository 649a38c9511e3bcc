//! On-disk instance control.
//!
//! An instance is a directory holding one container's configuration,
//! storage and lock. The layout:
//!
//! ```text
//! <instance>/
//! ├── etc/                   properties applied at deploy time
//! │   ├── framework.properties
//! │   ├── launching.properties
//! │   └── system.properties
//! ├── conf/                  user-writable configuration tree
//! ├── data/                  storage area owned by the container
//! ├── instance.lock          advisory-lock token
//! └── instance.link          host, port and secret while listening
//! ```
//!
//! All mutating operations require holding the lock on `instance.lock`;
//! [`InstanceControl`] couples the lock lifetime to its own.

use crate::constants::{
    COMMAND_LINK_FILE, ETC_PATH, FRAMEWORK_PROPERTIES, LAUNCHING_PROPERTIES, LOCK_FILE,
    SYSTEM_PROPERTIES,
};
use crate::error::{Error, Result};
use crate::lockfile::LockFile;
use crate::properties::{self, PropertiesFile};
use crate::remote::CommandLink;
use crate::{constants, fsutil};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tests whether the path could be an instance: its `etc/` subdirectory
/// must exist, which every deployment creates to store the properties.
pub fn seems_valid(path: &Path) -> bool {
    path.join(ETC_PATH).is_dir()
}

/// Attempts to load the command link file of the given instance.
pub fn command_link(path: &Path) -> Result<Option<CommandLink>> {
    CommandLink::load(&path.join(COMMAND_LINK_FILE))
}

/// The three effective property maps of an instance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstanceProperties {
    pub system: BTreeMap<String, String>,
    pub launching: BTreeMap<String, String>,
    pub framework: BTreeMap<String, String>,
}

/// Controls a deployment instance while holding its lock.
///
/// Opening the control creates the instance directory, acquires the lock
/// and ensures the `etc/` subdirectory exists. Dropping the control
/// releases the lock on every exit path.
pub struct InstanceControl {
    location: PathBuf,
    lock: LockFile,
}

impl InstanceControl {
    /// Acquires the control of the instance at the given location.
    pub fn open(location: &Path) -> Result<Self> {
        let location = fsutil::normalize(location);
        fs::create_dir_all(&location).map_err(|e| Error::instance_io(&location, &e))?;

        let lock = LockFile::acquire(location.join(LOCK_FILE))?;

        let etc = location.join(ETC_PATH);
        fs::create_dir_all(&etc).map_err(|e| Error::instance_io(&etc, &e))?;

        debug!("acquired instance control: {}", location.display());
        Ok(Self { location, lock })
    }

    /// Deletes the instance at the given path while ensuring that it could
    /// not be used during the operation.
    ///
    /// Returns `false` when the path does not exist; a path existing but
    /// not looking like an instance is refused.
    pub fn delete(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        if !seems_valid(path) {
            return Err(Error::Config(format!(
                "target path does not point to an instance: {}",
                path.display()
            )));
        }

        let lock_path = {
            let control = Self::open(path)?;
            control.clean()?;
            control.lock_path()
        };

        // Delete selectively as it might clash with a concurrent acquisition
        match fs::remove_file(&lock_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::instance_io(&lock_path, &e)),
        }

        match fs::remove_dir(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::instance_io(path, &e)),
        }

        Ok(true)
    }

    /// Returns the instance location.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Resolves a path relative to the location.
    pub fn path(&self, other: &str) -> PathBuf {
        self.location.join(other)
    }

    /// Returns `true` if the control is still held.
    pub fn acquired(&self) -> bool {
        self.lock.locked()
    }

    /// Deletes all data of the instance except the lock file.
    pub fn clean(&self) -> Result<()> {
        info!("cleaning instance data: {}", self.location.display());

        let lock_path = self.lock_path();
        fsutil::delete_filtered(&self.location, &|path| path != lock_path)?;
        Ok(())
    }

    /// Deletes the configuration tree of the instance.
    pub fn clean_configuration(&self) -> Result<()> {
        info!("cleaning instance configuration: {}", self.location.display());
        fsutil::delete(&self.path(constants::CONF_PATH))
    }

    /// Stores the effective properties under `etc/`.
    pub fn store_properties(&self, effective: &InstanceProperties) -> Result<()> {
        debug!("storing current properties");

        let etc = self.path(ETC_PATH);
        fs::create_dir_all(&etc).map_err(|e| Error::instance_io(&etc, &e))?;

        properties::save(&effective.framework, &etc.join(FRAMEWORK_PROPERTIES))?;
        properties::save(&effective.launching, &etc.join(LAUNCHING_PROPERTIES))?;
        properties::save(&effective.system, &etc.join(SYSTEM_PROPERTIES))?;
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        self.path(LOCK_FILE)
    }
}

impl std::fmt::Debug for InstanceControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceControl")
            .field("location", &self.location)
            .finish()
    }
}

/// Restores stored properties into the given maps, filling only the
/// missing entries: values already present dominate the persisted ones.
pub fn restore_properties(instance: &Path, result: &mut InstanceProperties) -> Result<()> {
    let etc = instance.join(ETC_PATH);

    PropertiesFile::optional(etc.join(SYSTEM_PROPERTIES)).restore_into(&mut result.system)?;
    PropertiesFile::optional(etc.join(LAUNCHING_PROPERTIES)).restore_into(&mut result.launching)?;
    PropertiesFile::optional(etc.join(FRAMEWORK_PROPERTIES)).restore_into(&mut result.framework)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("instance");

        let control = InstanceControl::open(&location).unwrap();
        assert!(control.acquired());
        assert!(location.join(ETC_PATH).is_dir());
        assert!(location.join(LOCK_FILE).exists());
        assert!(seems_valid(&location));
    }

    #[test]
    fn test_open_excludes_concurrent_control() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("instance");

        let _holder = InstanceControl::open(&location).unwrap();
        assert!(matches!(
            InstanceControl::open(&location),
            Err(Error::InstanceBusy(_))
        ));
    }

    #[test]
    fn test_store_and_restore_properties() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("instance");
        let control = InstanceControl::open(&location).unwrap();

        let mut stored = InstanceProperties::default();
        stored
            .framework
            .insert("container.level".to_string(), "100".to_string());
        stored
            .launching
            .insert("shutdown.timeout".to_string(), "5s".to_string());
        control.store_properties(&stored).unwrap();

        let mut restored = InstanceProperties::default();
        restored
            .launching
            .insert("shutdown.timeout".to_string(), "90s".to_string());
        restore_properties(&location, &mut restored).unwrap();

        // Values set before the restore dominate the persisted defaults
        assert_eq!(restored.launching.get("shutdown.timeout").unwrap(), "90s");
        assert_eq!(restored.framework.get("container.level").unwrap(), "100");
    }

    #[test]
    fn test_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("instance");

        {
            let control = InstanceControl::open(&location).unwrap();
            control
                .store_properties(&InstanceProperties::default())
                .unwrap();
        }

        assert!(InstanceControl::delete(&location).unwrap());
        assert!(!location.exists());

        // Deleting a missing instance reports it was missing already
        assert!(!InstanceControl::delete(&location).unwrap());
    }

    #[test]
    fn test_delete_refuses_foreign_directory() {
        let dir = TempDir::new().unwrap();
        let foreign = dir.path().join("something");
        fs::create_dir_all(&foreign).unwrap();

        assert!(InstanceControl::delete(&foreign).is_err());
    }

    #[test]
    fn test_clean_keeps_lock_file() {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("instance");
        let control = InstanceControl::open(&location).unwrap();

        fs::write(location.join("etc/framework.properties"), "a=1\n").unwrap();
        control.clean().unwrap();

        assert!(location.join(LOCK_FILE).exists());
        assert!(!location.join(ETC_PATH).exists());
        assert!(control.acquired());
    }
}
