//! The launch command.

use crate::args::{ConfigOption, parse_configuration};
use crate::commands::{Execution, SystemEffects, start, support};
use crate::container::ContainerFactory;
use crate::error::Result;
use crate::instance::InstanceControl;
use crate::launcher::InstanceRuntime;
use crate::status;
use tracing::info;

/// Deploys and starts an instance in one invocation.
pub fn run(
    args: &[String],
    factory: &dyn ContainerFactory,
    effects: &dyn SystemEffects,
    execution: &Execution,
) -> Result<()> {
    let configuration = parse_configuration(args, ConfigOption::ALL)?;
    support::apply_system_properties(&configuration, effects);

    info!("launching instance: {}", configuration.instance.display());
    let control = InstanceControl::open(&configuration.instance)?;

    let plan = if configuration.skip_deploy {
        info!("skipping deployment as requested");
        None
    } else {
        info!("preparing deployment");
        // Prepare the plan first as this only reads and does not touch the
        // instance yet
        let plan = support::build_plan(&configuration)?;
        support::clean(&control, &configuration)?;
        support::configure_tree(&control, &configuration)?;
        support::store_properties(&control, &configuration)?;
        Some(plan)
    };

    let mut runtime =
        InstanceRuntime::create(&control, factory, &configuration.properties.framework)?;
    runtime.set_shutdown_timeout(configuration.shutdown_timeout()?);

    if plan.is_some() {
        runtime.undeploy(&support::uninstall_matchers(&configuration)?);
    }
    if let Some(plan) = plan {
        runtime.deploy(plan);
    }

    if configuration.skip_start {
        status::dump(runtime.runtime(), &configuration);
        info!("skipping start as requested");
        runtime.kill();
        return Ok(());
    }

    start::launch(&runtime, &configuration, execution)
}
