//! Instance status formatting.

use crate::config::Configuration;
use crate::container::UnitState;
use crate::runtime::ContainerRuntime;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::{debug, info};

/// Reports the status of the runtime.
///
/// With `--dump-status` a detailed block with the effective properties and
/// the unit listing is printed; otherwise the listing goes to the debug
/// log only. A one-line summary is always logged last for a quick visual
/// check.
pub fn dump(runtime: &ContainerRuntime, configuration: &Configuration) {
    if configuration.dump_status {
        println!("{}", format_status(runtime, configuration));
    } else {
        debug!("{}", format_listing(runtime));
    }

    info!("{}", format_summary(runtime));
}

fn format_status(runtime: &ContainerRuntime, configuration: &Configuration) -> String {
    let mut result = String::new();

    let _ = writeln!(result, "Instance: {}", configuration.instance.display());

    if !configuration.parameters.is_empty() {
        let _ = writeln!(result, "Parameters: {:?}", configuration.parameters);
    }

    let _ = writeln!(result, "Container properties:");
    for (name, value) in runtime.properties() {
        let _ = writeln!(result, "  {name}={value}");
    }

    result.push_str(&format_listing(runtime));

    let faults = runtime.bundle_faults();
    if !faults.is_empty() {
        let _ = writeln!(result, "Deployment faults:");
        for fault in faults {
            let _ = writeln!(result, "  {fault}");
        }
    }

    result
}

fn format_listing(runtime: &ContainerRuntime) -> String {
    let mut result = String::from("Units:\n");

    let mut units = runtime.container().units();
    units.sort_by(|a, b| a.id.cmp(&b.id));

    for unit in units {
        let _ = writeln!(
            result,
            "  #{} {} [{}] level {}",
            unit.id,
            unit.location,
            unit.state.name(),
            unit.start_level
        );
    }

    result
}

fn format_summary(runtime: &ContainerRuntime) -> String {
    let units = runtime.container().units();

    let mut counts: BTreeMap<UnitState, usize> = BTreeMap::new();
    for unit in &units {
        *counts.entry(unit.state).or_default() += 1;
    }

    let breakdown: Vec<String> = counts
        .iter()
        .map(|(state, count)| format!("{count} {}", state.name()))
        .collect();

    format!(
        "Container with total {} unit(s): {}.",
        units.len(),
        breakdown.join(", ")
    )
}
