//! The delete command.

use crate::args::Arguments;
use crate::error::Result;
use crate::instance::InstanceControl;
use std::path::PathBuf;
use tracing::info;

/// Deletes the given instance.
pub fn run(args: &[String]) -> Result<()> {
    let path = PathBuf::from(Arguments::new(args).require("INSTANCE")?);

    info!("deleting instance: {}", path.display());

    if !InstanceControl::delete(&path)? {
        info!("the instance was missing already");
    }

    Ok(())
}
