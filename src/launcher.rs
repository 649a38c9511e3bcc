//! Running a container bound to an instance.
//!
//! [`InstanceRuntime`] binds a [`ContainerRuntime`] to an on-disk instance:
//! it injects the reserved instance properties before the container is
//! created, manages the command link file and runs the optional command
//! server for the lifetime of a launch.

use crate::constants::{
    COMMAND_LINK_FILE, COMMAND_STOP, PROPERTY_CONTAINER_STORAGE, PROPERTY_INSTANCE_CONF,
    PROPERTY_INSTANCE_ROOT,
};
use crate::container::ContainerFactory;
use crate::deploy::DeploymentPlan;
use crate::error::Result;
use crate::glob::PathPattern;
use crate::instance::InstanceControl;
use crate::interpolate::interpolate;
use crate::remote::{CommandLink, CommandServer, CryptoProtection};
use crate::runtime::ContainerRuntime;
use crate::{constants, fsutil};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runs a container instance.
pub struct InstanceRuntime {
    runtime: Arc<ContainerRuntime>,
    location: PathBuf,
}

impl InstanceRuntime {
    /// Creates a new instance bound to the controlled instance directory.
    ///
    /// The container properties get the reserved instance properties
    /// injected, all values interpolated with them, and the container
    /// storage pointed into the instance unless set explicitly.
    pub fn create(
        control: &InstanceControl,
        factory: &dyn ContainerFactory,
        container_properties: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let properties = instance_properties(control, container_properties);
        let runtime = ContainerRuntime::create(factory, properties)?;

        Ok(Self {
            runtime: Arc::new(runtime),
            location: control.location().to_path_buf(),
        })
    }

    /// Sets the timeout for waiting on a container shutdown.
    pub fn set_shutdown_timeout(&mut self, timeout: Option<Duration>) {
        Arc::get_mut(&mut self.runtime)
            .expect("runtime not shared before launching")
            .set_shutdown_timeout(timeout);
    }

    /// Returns the underlying runtime.
    pub fn runtime(&self) -> &ContainerRuntime {
        &self.runtime
    }

    /// Returns a handle that can kill the runtime from another thread.
    pub fn kill_handle(&self) -> Arc<ContainerRuntime> {
        Arc::clone(&self.runtime)
    }

    /// Executes the deployment plan.
    pub fn deploy(&self, plan: DeploymentPlan) {
        self.runtime.deploy(plan);
    }

    /// Uninstalls all units whose location matches any of the patterns.
    pub fn undeploy(&self, matchers: &[PathPattern]) {
        self.runtime.undeploy(matchers);
    }

    /// Kills the runtime.
    pub fn kill(&self) {
        self.runtime.kill();
    }

    /// Launches the container and waits for it to stop, optionally
    /// listening for commands on the given link.
    ///
    /// The link file is deleted before the launch, so a failing bind never
    /// leaves stale data behind, written with the resolved port once the
    /// server is bound, and deleted again when the launch finishes.
    pub fn launch(
        &self,
        link: Option<&CommandLink>,
        on_start: impl Fn(&ContainerRuntime),
    ) -> Result<bool> {
        self.delete_link_file();

        let Some(link) = link else {
            return self.runtime.launch(on_start);
        };

        let mut server = self.command_server(link)?;
        let bound = server.address();
        info!("using command link: {bound}");

        let result = match self.store_link_file(link, bound) {
            Ok(()) => self.runtime.launch(on_start),
            Err(e) => Err(e),
        };

        server.close();
        self.delete_link_file();
        result
    }

    /// Executes a received command payload: newline-separated verbs with
    /// `#` starting a comment line.
    pub fn command(runtime: &ContainerRuntime, command: &str, origin: SocketAddr) {
        debug!("received command from: {origin}");

        for verb in command.split('\n') {
            if verb.starts_with('#') || verb.is_empty() {
                continue;
            }

            if verb == COMMAND_STOP {
                info!("received the stop command from: {origin}");
                runtime.kill();
            } else {
                warn!("unknown command: {verb}");
            }
        }
    }

    fn command_server(&self, link: &CommandLink) -> Result<CommandServer> {
        let protection = CryptoProtection::new(link.secret())?;
        let runtime = self.kill_handle();

        CommandServer::open(
            &link.address(),
            protection,
            Arc::new(move |command: &str, origin| Self::command(&runtime, command, origin)),
            Arc::new(|e: &crate::error::Error| error!("command link dropped unexpectedly: {e}")),
        )
    }

    fn link_file(&self) -> PathBuf {
        self.location.join(COMMAND_LINK_FILE)
    }

    fn store_link_file(&self, link: &CommandLink, bound: SocketAddr) -> Result<()> {
        let resolved = link.with_address(link.host(), bound.port());
        resolved.save(&self.link_file())
    }

    fn delete_link_file(&self) {
        let path = self.link_file();
        if let Err(e) = std::fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!("could not delete the command link file {}: {e}", path.display());
        }
    }
}

/// Builds the effective container properties for an instance.
fn instance_properties(
    control: &InstanceControl,
    container_properties: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let root = fsutil::absolute_path(control.location());
    let conf = root.join(constants::CONF_PATH);

    let mut updates = BTreeMap::new();
    updates.insert(
        PROPERTY_INSTANCE_ROOT.to_string(),
        root.display().to_string(),
    );
    updates.insert(
        PROPERTY_INSTANCE_CONF.to_string(),
        conf.display().to_string(),
    );

    let mut result: BTreeMap<String, String> = container_properties
        .iter()
        .map(|(name, value)| {
            let resolved = interpolate(value, |placeholder| updates.get(placeholder).cloned());
            (name.clone(), resolved)
        })
        .collect();

    for (name, value) in updates {
        result.insert(name, value);
    }

    result
        .entry(PROPERTY_CONTAINER_STORAGE.to_string())
        .or_insert_with(|| root.join(constants::DATA_PATH).display().to_string());

    result
}
