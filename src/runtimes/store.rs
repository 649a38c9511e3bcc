//! File-backed reference container.
//!
//! `StoreContainer` keeps its units in a registry file under the container
//! storage area and copies every installed archive next to it. It performs
//! no code loading: a unit with the `Started` autostart intent becomes
//! `Active` when the container starts, everything else stays `Resolved`.
//! The backend exists so the launcher is usable end to end without an
//! external container; it honors the same storage properties a real
//! backend would.

use crate::constants::{PROPERTY_CONTAINER_STORAGE, PROPERTY_CONTAINER_STORAGE_CLEAN};
use crate::container::{
    Autostart, Container, ContainerFactory, ROOT_UNIT, StopEvent, UnitId, UnitInfo, UnitState,
};
use crate::error::{Error, Result};
use crate::{fsutil, properties};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Name of the registry file within the storage area.
const REGISTRY_FILE: &str = "units.properties";

/// Name of the archive directory within the storage area.
const ARCHIVES_PATH: &str = "archives";

/// Location recorded for the container's own root unit.
const ROOT_LOCATION: &str = "container:system";

/// Creates [`StoreContainer`] instances.
pub struct StoreContainerFactory;

impl ContainerFactory for StoreContainerFactory {
    fn create(&self, properties: &BTreeMap<String, String>) -> Result<Box<dyn Container>> {
        let storage = properties.get(PROPERTY_CONTAINER_STORAGE).ok_or_else(|| {
            Error::Container {
                operation: "create".to_string(),
                reason: format!("missing the {PROPERTY_CONTAINER_STORAGE} property"),
            }
        })?;

        let clean = properties
            .get(PROPERTY_CONTAINER_STORAGE_CLEAN)
            .is_some_and(|value| !value.eq_ignore_ascii_case("false"));

        Ok(Box::new(StoreContainer::new(PathBuf::from(storage), clean)))
    }
}

/// Launch phase of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Initialized,
    Active,
    Stopped,
}

#[derive(Debug, Clone)]
struct UnitRecord {
    location: String,
    state: UnitState,
    start_level: u32,
    autostart: Option<Autostart>,
}

#[derive(Debug)]
struct Registry {
    units: BTreeMap<UnitId, UnitRecord>,
    next_id: UnitId,
    phase: Phase,
    stopped_as: StopEvent,
}

/// The file-backed reference container.
pub struct StoreContainer {
    storage: PathBuf,
    clean: bool,
    registry: Mutex<Registry>,
    stopping: Condvar,
}

impl StoreContainer {
    /// Creates a new instance over the given storage area.
    pub fn new(storage: PathBuf, clean: bool) -> Self {
        let mut units = BTreeMap::new();
        units.insert(
            ROOT_UNIT,
            UnitRecord {
                location: ROOT_LOCATION.to_string(),
                state: UnitState::Resolved,
                start_level: 0,
                autostart: None,
            },
        );

        Self {
            storage,
            clean,
            registry: Mutex::new(Registry {
                units,
                next_id: 1,
                phase: Phase::Created,
                stopped_as: StopEvent::Stopped,
            }),
            stopping: Condvar::new(),
        }
    }

    fn locked(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn registry_path(&self) -> PathBuf {
        self.storage.join(REGISTRY_FILE)
    }

    fn archive_path(&self, unit: UnitId) -> PathBuf {
        self.storage.join(ARCHIVES_PATH).join(unit.to_string())
    }

    /// Persists the registry. Call with the registry lock held.
    fn persist(&self, registry: &Registry) -> Result<()> {
        let mut data = BTreeMap::new();
        data.insert("next.id".to_string(), registry.next_id.to_string());

        for (id, unit) in &registry.units {
            if *id == ROOT_UNIT {
                continue;
            }

            data.insert(format!("unit.{id}.location"), unit.location.clone());
            data.insert(format!("unit.{id}.level"), unit.start_level.to_string());
            if let Some(autostart) = unit.autostart {
                let value = match autostart {
                    Autostart::Started => "started",
                    Autostart::Stopped => "stopped",
                };
                data.insert(format!("unit.{id}.autostart"), value.to_string());
            }
        }

        properties::save(&data, &self.registry_path())
    }

    /// Loads the registry from the storage area. Call with the lock held.
    fn load(&self, registry: &mut Registry) -> Result<()> {
        let file = properties::PropertiesFile::optional(self.registry_path());
        let data = file.load()?;

        if let Some(next) = data.get("next.id").and_then(|value| value.parse().ok()) {
            registry.next_id = next;
        }

        for (key, value) in &data {
            let Some(rest) = key.strip_prefix("unit.") else {
                continue;
            };
            let Some(id_text) = rest.strip_suffix(".location") else {
                continue;
            };
            let Ok(id) = id_text.parse::<UnitId>() else {
                continue;
            };

            let start_level = data
                .get(&format!("unit.{id}.level"))
                .and_then(|level| level.parse().ok())
                .unwrap_or(0);

            let autostart = match data.get(&format!("unit.{id}.autostart")).map(String::as_str) {
                Some("started") => Some(Autostart::Started),
                Some("stopped") => Some(Autostart::Stopped),
                _ => None,
            };

            registry.units.insert(
                id,
                UnitRecord {
                    location: value.clone(),
                    state: UnitState::Installed,
                    start_level,
                    autostart,
                },
            );
        }

        Ok(())
    }

    fn store_archive(&self, unit: UnitId, data: &mut dyn Read) -> Result<()> {
        let path = self.archive_path(unit);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut content = Vec::new();
        data.read_to_end(&mut content)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn require_unit<'r>(
        registry: &'r mut Registry,
        unit: UnitId,
        operation: &str,
    ) -> Result<&'r mut UnitRecord> {
        registry.units.get_mut(&unit).ok_or_else(|| Error::Container {
            operation: operation.to_string(),
            reason: format!("no such unit: {unit}"),
        })
    }
}

impl Container for StoreContainer {
    fn init(&self) -> Result<()> {
        let mut registry = self.locked();
        if registry.phase != Phase::Created {
            return Ok(());
        }

        if self.clean && self.storage.exists() {
            info!("cleaning container storage: {}", self.storage.display());
            fsutil::delete(&self.storage)?;
        }

        fs::create_dir_all(&self.storage)?;
        self.load(&mut registry)?;
        registry.phase = Phase::Initialized;
        debug!("container initialized at {}", self.storage.display());
        Ok(())
    }

    fn start(&self) -> Result<()> {
        let mut registry = self.locked();
        if registry.phase == Phase::Created {
            return Err(Error::Container {
                operation: "start".to_string(),
                reason: "container not initialized".to_string(),
            });
        }

        registry.phase = Phase::Active;
        registry.stopped_as = StopEvent::Stopped;

        for (id, unit) in registry.units.iter_mut() {
            if *id == ROOT_UNIT {
                unit.state = UnitState::Active;
            } else if unit.autostart == Some(Autostart::Started) {
                unit.state = UnitState::Active;
            } else {
                unit.state = UnitState::Resolved;
            }
        }

        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut registry = self.locked();
        if registry.phase != Phase::Active {
            return Ok(());
        }

        for unit in registry.units.values_mut() {
            if unit.state == UnitState::Active {
                unit.state = UnitState::Resolved;
            }
        }

        registry.phase = Phase::Stopped;
        self.stopping.notify_all();
        Ok(())
    }

    fn wait_for_stop(&self, timeout: Option<Duration>) -> Result<StopEvent> {
        let mut registry = self.locked();

        match timeout {
            None => {
                while registry.phase == Phase::Active {
                    registry = self
                        .stopping
                        .wait(registry)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
            Some(timeout) => {
                let (result, outcome) = self
                    .stopping
                    .wait_timeout_while(registry, timeout, |registry| {
                        registry.phase == Phase::Active
                    })
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                registry = result;

                if outcome.timed_out() && registry.phase == Phase::Active {
                    return Ok(StopEvent::TimedOut);
                }
            }
        }

        Ok(registry.stopped_as)
    }

    fn find(&self, location: &str) -> Option<UnitId> {
        self.locked()
            .units
            .iter()
            .find(|(_, unit)| unit.location == location)
            .map(|(id, _)| *id)
    }

    fn units(&self) -> Vec<UnitInfo> {
        self.locked()
            .units
            .iter()
            .map(|(id, unit)| UnitInfo {
                id: *id,
                location: unit.location.clone(),
                state: unit.state,
                start_level: unit.start_level,
            })
            .collect()
    }

    fn state(&self, unit: UnitId) -> Result<UnitState> {
        Ok(self
            .locked()
            .units
            .get(&unit)
            .map(|record| record.state)
            .unwrap_or(UnitState::Uninstalled))
    }

    fn install(&self, location: &str, data: &mut dyn Read) -> Result<UnitId> {
        let mut registry = self.locked();

        if let Some(existing) = registry
            .units
            .iter()
            .find(|(_, unit)| unit.location == location)
            .map(|(id, _)| *id)
        {
            return Ok(existing);
        }

        let id = registry.next_id;
        registry.next_id += 1;

        self.store_archive(id, data)?;
        registry.units.insert(
            id,
            UnitRecord {
                location: location.to_string(),
                state: UnitState::Installed,
                start_level: 0,
                autostart: None,
            },
        );

        self.persist(&registry)?;
        debug!("installed unit {id}: {location}");
        Ok(id)
    }

    fn update(&self, unit: UnitId, data: &mut dyn Read) -> Result<()> {
        let mut registry = self.locked();
        Self::require_unit(&mut registry, unit, "update")?;
        self.store_archive(unit, data)?;
        debug!("updated unit {unit}");
        Ok(())
    }

    fn uninstall(&self, unit: UnitId) -> Result<()> {
        if unit == ROOT_UNIT {
            return Err(Error::Container {
                operation: "uninstall".to_string(),
                reason: "the root unit cannot be uninstalled".to_string(),
            });
        }

        let mut registry = self.locked();
        let removed = registry.units.remove(&unit).ok_or_else(|| Error::Container {
            operation: "uninstall".to_string(),
            reason: format!("no such unit: {unit}"),
        })?;

        let _ = fs::remove_file(self.archive_path(unit));
        self.persist(&registry)?;
        debug!("uninstalled unit {unit}: {}", removed.location);
        Ok(())
    }

    fn set_start_level(&self, unit: UnitId, level: u32) -> Result<()> {
        if level == 0 {
            return Err(Error::Container {
                operation: "set_start_level".to_string(),
                reason: "start level must be positive".to_string(),
            });
        }

        let mut registry = self.locked();
        Self::require_unit(&mut registry, unit, "set_start_level")?.start_level = level;
        self.persist(&registry)?;
        Ok(())
    }

    fn set_autostart(&self, unit: UnitId, autostart: Autostart) -> Result<()> {
        let mut registry = self.locked();
        Self::require_unit(&mut registry, unit, "set_autostart")?.autostart = Some(autostart);
        self.persist(&registry)?;
        Ok(())
    }
}
