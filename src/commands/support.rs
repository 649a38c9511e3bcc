//! Shared functionality of the configured commands.

use crate::config::Configuration;
use crate::constants;
use crate::deploy::{DeploymentPlan, DeploymentSetup};
use crate::error::Result;
use crate::fsutil;
use crate::glob::PathPattern;
use crate::instance::InstanceControl;
use std::fs;
use tracing::{debug, info};

/// Computes the deployment plan for the configuration.
///
/// This only reads the bundle sources and does not touch the instance.
pub fn build_plan(configuration: &Configuration) -> Result<DeploymentPlan> {
    let mut setup = DeploymentSetup::new();
    setup.configure_defaults(&configuration.properties.launching);

    for provider in &configuration.bundles {
        for source in provider.resolve()? {
            setup.configure_source(&source)?;
        }
    }

    Ok(setup.into_plan())
}

/// Compiles the uninstall expressions into location matchers.
pub fn uninstall_matchers(configuration: &Configuration) -> Result<Vec<PathPattern>> {
    configuration
        .uninstall_bundles
        .iter()
        .map(|expression| PathPattern::new(expression))
        .collect()
}

/// Performs the configured cleaning operations.
pub fn clean(control: &InstanceControl, configuration: &Configuration) -> Result<()> {
    if configuration.clean_instance {
        // The total clean covers the configuration tree as well
        info!("cleaning the instance");
        return control.clean();
    }

    if configuration.clean_configuration {
        info!("cleaning the configuration");
        control.clean_configuration()?;
    }

    Ok(())
}

/// Populates the configuration tree of the instance: the create sources
/// seed `conf/` only when absent, the update sources overlay it always.
pub fn configure_tree(control: &InstanceControl, configuration: &Configuration) -> Result<()> {
    debug!("setting up the configuration");

    let target = control.path(constants::CONF_PATH);

    if !target.exists() {
        fs::create_dir_all(&target)?;
        for source in &configuration.create_configuration {
            fsutil::copy_to(&target, source)?;
        }
    }

    for source in &configuration.update_configuration {
        fsutil::copy_to(&target, source)?;
    }

    Ok(())
}

/// Stores the effective properties of the configuration under `etc/`.
pub fn store_properties(control: &InstanceControl, configuration: &Configuration) -> Result<()> {
    control.store_properties(&configuration.properties)
}

/// Applies the configured system properties through the effects handler.
pub fn apply_system_properties(
    configuration: &Configuration,
    effects: &dyn crate::commands::SystemEffects,
) {
    for (name, value) in &configuration.properties.system {
        effects.set_property(name, value);
    }
}
