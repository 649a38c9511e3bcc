//! Module container abstraction.
//!
//! The launcher does not embed a module container; it drives one through
//! the traits defined here. The host environment supplies a
//! [`ContainerFactory`] and the launcher takes care of the lifecycle:
//! create → init → deploy → start → wait for stop.

use crate::error::Result;
use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

/// Identifier of an installed unit within a container.
///
/// The identifier `0` is reserved for the container's own root unit, which
/// the launcher never installs, updates or uninstalls.
pub type UnitId = u64;

/// The root unit identifier.
pub const ROOT_UNIT: UnitId = 0;

/// Outcome of waiting for a container to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopEvent {
    /// The container stopped.
    Stopped,
    /// The container stopped because of an update and should be started
    /// again.
    StoppedUpdate,
    /// The wait timed out while the container keeps running.
    TimedOut,
}

/// Lifecycle state of an installed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UnitState {
    Installed,
    Resolved,
    Starting,
    Active,
    Stopping,
    Uninstalled,
}

impl UnitState {
    /// Returns the lowercase name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            UnitState::Installed => "installed",
            UnitState::Resolved => "resolved",
            UnitState::Starting => "starting",
            UnitState::Active => "active",
            UnitState::Stopping => "stopping",
            UnitState::Uninstalled => "uninstalled",
        }
    }
}

/// The persisted autostart intent of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Autostart {
    /// The unit should not activate when its start level is reached.
    Stopped,
    /// The unit should activate when its start level is reached.
    Started,
}

/// A snapshot describing an installed unit.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    /// The container-assigned identifier.
    pub id: UnitId,
    /// The location string the unit was installed under.
    pub location: String,
    /// The current state.
    pub state: UnitState,
    /// The assigned start level.
    pub start_level: u32,
}

/// Creates container instances from effective properties.
pub trait ContainerFactory {
    /// Creates a fresh container configured by the given properties.
    fn create(&self, properties: &BTreeMap<String, String>) -> Result<Box<dyn Container>>;
}

/// A module container driven by the launcher.
///
/// All operations take `&self`: a container must be safe to share between
/// the launcher's control thread and the command channel thread, which may
/// request [`Container::stop`] while the control thread blocks inside
/// [`Container::wait_for_stop`]. Install, update and uninstall calls are
/// never issued concurrently.
pub trait Container: Send + Sync {
    /// Initializes the container so it can accept deployment operations.
    fn init(&self) -> Result<()>;

    /// Starts the container.
    fn start(&self) -> Result<()>;

    /// Requests the container to stop.
    fn stop(&self) -> Result<()>;

    /// Blocks until the container stops or the timeout elapses; `None`
    /// waits indefinitely.
    fn wait_for_stop(&self, timeout: Option<Duration>) -> Result<StopEvent>;

    /// Finds a unit by its location.
    fn find(&self, location: &str) -> Option<UnitId>;

    /// Lists all installed units.
    fn units(&self) -> Vec<UnitInfo>;

    /// Returns the current state of the unit.
    fn state(&self, unit: UnitId) -> Result<UnitState>;

    /// Installs a unit from the given data under the location.
    fn install(&self, location: &str, data: &mut dyn Read) -> Result<UnitId>;

    /// Updates an installed unit from the given data.
    fn update(&self, unit: UnitId, data: &mut dyn Read) -> Result<()>;

    /// Uninstalls the unit.
    fn uninstall(&self, unit: UnitId) -> Result<()>;

    /// Assigns the start level of the unit; must be positive.
    fn set_start_level(&self, unit: UnitId, level: u32) -> Result<()>;

    /// Applies the autostart setting to the unit.
    fn set_autostart(&self, unit: UnitId, autostart: Autostart) -> Result<()>;
}
