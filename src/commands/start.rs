//! The start command.

use crate::args::{ConfigOption, parse_configuration};
use crate::commands::{Execution, SystemEffects, support};
use crate::config::Configuration;
use crate::constants::PROPERTY_CONTAINER_STORAGE_CLEAN;
use crate::container::ContainerFactory;
use crate::error::Result;
use crate::instance::{self, InstanceControl};
use crate::launcher::InstanceRuntime;
use crate::remote::CommandLink;
use crate::status;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Loads an existing instance and runs its container.
pub fn run(
    args: &[String],
    factory: &dyn ContainerFactory,
    effects: &dyn SystemEffects,
    execution: &Execution,
) -> Result<()> {
    let configuration = configuration(args)?;
    support::apply_system_properties(&configuration, effects);

    info!("starting instance: {}", configuration.instance.display());
    let control = InstanceControl::open(&configuration.instance)?;

    let mut runtime =
        InstanceRuntime::create(&control, factory, &configuration.properties.framework)?;
    runtime.set_shutdown_timeout(configuration.shutdown_timeout()?);

    launch(&runtime, &configuration, execution)
}

/// Runs the prepared runtime, wiring the cancel hook and the optional
/// command link. Shared with the launch command.
pub fn launch(
    runtime: &InstanceRuntime,
    configuration: &Configuration,
    execution: &Execution,
) -> Result<()> {
    let kill_handle = runtime.kill_handle();
    if execution.on_cancel(Box::new(move || kill_handle.kill())) {
        info!("start aborted");
        return Ok(());
    }

    info!("starting the container");

    let link = match &configuration.command_address {
        Some((host, port)) => Some(CommandLink::new(host, *port, &configuration.command_secret)?),
        None => None,
    };

    let started = AtomicBool::new(false);
    runtime.launch(link.as_ref(), |context| {
        debug!("container started");
        if !started.swap(true, Ordering::SeqCst) {
            status::dump(context, configuration);
        }
    })?;

    Ok(())
}

/// Parses the start configuration: stored instance properties fill the
/// gaps after the explicit ones, and a persisted storage clean-up request
/// is dropped to prevent data loss on restart.
fn configuration(args: &[String]) -> Result<Configuration> {
    let mut result = parse_configuration(args, ConfigOption::START)?;

    instance::restore_properties(&result.instance, &mut result.properties)?;
    info!("restored instance properties");

    result
        .properties
        .framework
        .remove(PROPERTY_CONTAINER_STORAGE_CLEAN);

    Ok(result)
}
