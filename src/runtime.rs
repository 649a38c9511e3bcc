//! Container lifecycle driving.
//!
//! [`ContainerRuntime`] wraps a container created from a factory and
//! drives it through init, deployment, the start/wait/restart loop and the
//! graceful shutdown. The kill flag shared with the command channel thread
//! synchronizes on a single mutex with the restart check, so a stop
//! requested between updates reliably prevents the next start.

use crate::container::{Container, ContainerFactory, ROOT_UNIT, StopEvent, UnitState};
use crate::deploy::{BundleDeployment, DeployAction, DeploymentPlan};
use crate::error::{Error, Result};
use crate::glob::PathPattern;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Drives a container through its lifecycle.
pub struct ContainerRuntime {
    container: Box<dyn Container>,
    properties: BTreeMap<String, String>,
    shutdown_timeout: Option<Duration>,
    killed: Mutex<bool>,
    bundle_faults: Mutex<Vec<String>>,
}

impl ContainerRuntime {
    /// Creates the container from the given properties and initializes it.
    pub fn create(
        factory: &dyn ContainerFactory,
        properties: BTreeMap<String, String>,
    ) -> Result<Self> {
        let container = factory.create(&properties)?;
        container.init()?;

        Ok(Self {
            container,
            properties,
            shutdown_timeout: None,
            killed: Mutex::new(false),
            bundle_faults: Mutex::new(Vec::new()),
        })
    }

    /// Sets the timeout for waiting on a container shutdown; `None` waits
    /// indefinitely.
    pub fn set_shutdown_timeout(&mut self, timeout: Option<Duration>) {
        self.shutdown_timeout = timeout;
    }

    /// Returns the properties the container was created from.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Returns the driven container.
    pub fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    /// Executes the deployment plan.
    ///
    /// Every installed unit is first bound into the plan, so location
    /// scoped defaults apply to units that have no source on disk anymore.
    /// Failures of a single bundle are logged and do not abort the rest of
    /// the plan.
    pub fn deploy(&self, mut plan: DeploymentPlan) {
        for unit in self.container.units() {
            if unit.id != ROOT_UNIT {
                plan.bundle(&unit.location);
            }
        }

        for deployment in plan.bundles() {
            debug!("executing operation {deployment:?}");
            if let Err(e) = self.execute(deployment) {
                let fault = Error::BundleOp {
                    location: deployment.location().to_string(),
                    reason: e.to_string(),
                };

                error!("{fault}");
                self.bundle_faults
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(fault.to_string());
            }
        }
    }

    /// Returns the bundle faults collected while executing plans.
    pub fn bundle_faults(&self) -> Vec<String> {
        self.bundle_faults
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Executes the deployment actions for a single bundle.
    fn execute(&self, deployment: &BundleDeployment) -> Result<()> {
        let location = deployment.location();
        let actions = deployment.settings().actions();
        let found = self.container.find(location);

        let Some(unit) = found else {
            // All other scenarios depend on the unit being present
            if actions.contains(DeployAction::Install)
                && let Some(source) = deployment.source()
            {
                let mut data = source.open()?;
                let unit = self.container.install(location, data.as_mut())?;
                self.apply_settings(unit, deployment)?;
            }

            return Ok(());
        };

        if actions.contains(DeployAction::Uninstall) && deployment.source().is_none() {
            self.uninstall(unit, location);
        } else if actions.contains(DeployAction::Update)
            && let Some(source) = deployment.source()
        {
            let mut data = source.open()?;
            self.container.update(unit, data.as_mut())?;
            self.apply_settings(unit, deployment)?;
        }

        Ok(())
    }

    fn apply_settings(&self, unit: crate::container::UnitId, deployment: &BundleDeployment) -> Result<()> {
        let settings = deployment.settings();

        if settings.start_level() > 0 {
            self.container.set_start_level(unit, settings.start_level())?;
        }

        if let Some(autostart) = settings.autostart() {
            self.container.set_autostart(unit, autostart)?;
        }

        Ok(())
    }

    /// Uninstalls all units whose location matches any of the patterns.
    /// The root unit is never touched.
    pub fn undeploy(&self, matchers: &[PathPattern]) {
        if matchers.is_empty() {
            return;
        }

        for unit in self.container.units() {
            if unit.id == ROOT_UNIT {
                continue;
            }

            if matchers.iter().any(|matcher| matcher.matches(&unit.location)) {
                debug!("uninstalling bundle: {}", unit.location);
                self.uninstall(unit.id, &unit.location);
            }
        }
    }

    /// Uninstalls tolerating a unit that reached its terminal state
    /// concurrently.
    fn uninstall(&self, unit: crate::container::UnitId, location: &str) {
        if let Err(e) = self.container.uninstall(unit) {
            match self.container.state(unit) {
                Ok(UnitState::Uninstalled) => {}
                _ => error!("failed to uninstall bundle: {location}: {e}"),
            }
        }
    }

    /// Launches the container and waits for it to stop.
    ///
    /// When the container stops because of an update, it is started again,
    /// unless [`ContainerRuntime::kill`] was requested meanwhile. The
    /// callback is invoked after every successful start.
    ///
    /// Returns `true` if the container stopped, `false` when it was killed
    /// before it could be started or restarted between updates.
    pub fn launch(&self, on_start: impl Fn(&Self)) -> Result<bool> {
        loop {
            debug!("container to be started");

            {
                let killed = self.killed.lock().unwrap_or_else(|e| e.into_inner());
                if *killed {
                    debug!("container start aborted");
                    return Ok(false);
                }

                self.container.start().map_err(|e| Error::Container {
                    operation: "start".to_string(),
                    reason: e.to_string(),
                })?;

                on_start(self);
            }

            if self.container.wait_for_stop(None)? != StopEvent::StoppedUpdate {
                debug!("container stopped");
                return Ok(true);
            }

            debug!("container stopped due to an update and shall be restarted");
        }
    }

    /// Stops the container and waits for the shutdown.
    pub fn stop(&self) -> Result<()> {
        debug!("container to be stopped");
        self.container.stop()?;
        self.await_shutdown()
    }

    /// Marks the runtime killed and stops the container.
    ///
    /// Once flagged, the launch loop refuses to restart the container.
    /// Failures are reported but swallowed, so a kill is always effective.
    pub fn kill(&self) {
        {
            let mut killed = self.killed.lock().unwrap_or_else(|e| e.into_inner());
            *killed = true;
            debug!("container to be killed");

            if let Err(e) = self.container.stop() {
                warn!("stopping the container finished with an error: {e}");
                return;
            }
        }

        if let Err(e) = self.await_shutdown() {
            warn!("waiting for the container shutdown failed: {e}");
        }
    }

    fn await_shutdown(&self) -> Result<()> {
        if self.container.wait_for_stop(self.shutdown_timeout)? == StopEvent::TimedOut {
            warn!("timeout when waiting for the container to terminate");
        }

        Ok(())
    }
}
