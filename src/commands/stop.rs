//! The stop command.

use crate::constants::COMMAND_STOP;
use crate::error::{Error, Result};
use crate::instance;
use crate::remote::{CommandLink, CommandSender, CryptoProtection};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Asks a running instance to stop through its command link.
///
/// The link parameters come either from the `instance.link` file of the
/// given instance, or explicitly as `HOST PORT SECRET`.
pub fn run(args: &[String]) -> Result<()> {
    let link = parse(args)?;
    let protection = CryptoProtection::new(link.secret())?;

    let command_id = Uuid::new_v4();
    info!(
        "sending the stop command '{command_id}' to: {}",
        link.address()
    );

    let sender = CommandSender::new(link.address(), protection);
    sender.send(&command(command_id))
}

fn parse(args: &[String]) -> Result<CommandLink> {
    match args.len() {
        1 => {
            let path = Path::new(&args[0]);
            instance::command_link(path)?
                .ok_or_else(|| Error::Config(format!("no command link exposed: {}", args[0])))
        }
        3 => CommandLink::from_args(args),
        _ => Err(Error::Syntax(
            "stop requires INSTANCE, or HOST PORT SECRET".to_string(),
        )),
    }
}

/// Formats the command payload: an identifying comment and the verb.
fn command(command_id: Uuid) -> String {
    format!("#id: {command_id}\n{COMMAND_STOP}")
}
