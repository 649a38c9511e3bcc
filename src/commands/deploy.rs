//! The deploy command.

use crate::args::{ConfigOption, parse_configuration};
use crate::commands::{SystemEffects, support};
use crate::container::ContainerFactory;
use crate::error::Result;
use crate::instance::InstanceControl;
use crate::launcher::InstanceRuntime;
use crate::status;
use tracing::info;

/// Materializes the instance and deploys the configured bundles into it.
pub fn run(
    args: &[String],
    factory: &dyn ContainerFactory,
    effects: &dyn SystemEffects,
) -> Result<()> {
    let configuration = parse_configuration(args, ConfigOption::DEPLOY)?;
    support::apply_system_properties(&configuration, effects);

    info!("deploying instance: {}", configuration.instance.display());
    let control = InstanceControl::open(&configuration.instance)?;

    // Prepare the plan first as this only reads and does not touch the
    // instance yet
    let plan = support::build_plan(&configuration)?;

    support::clean(&control, &configuration)?;
    support::configure_tree(&control, &configuration)?;
    support::store_properties(&control, &configuration)?;

    let mut runtime =
        InstanceRuntime::create(&control, factory, &configuration.properties.framework)?;
    runtime.set_shutdown_timeout(configuration.shutdown_timeout()?);

    runtime.undeploy(&support::uninstall_matchers(&configuration)?);
    runtime.deploy(plan);

    status::dump(runtime.runtime(), &configuration);

    // Make the container terminate
    runtime.kill();
    Ok(())
}
