//! Launcher commands.
//!
//! Every invocation of the launcher runs exactly one command. The command
//! is a one-shot action: it may be executed at most once, and it can be
//! cancelled, which either prevents it from starting or invokes its
//! registered cancellation handler while it runs.

mod delete;
mod deploy;
mod launch;
mod start;
mod stop;
mod support;

use crate::container::ContainerFactory;
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// The launcher command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the usage description.
    Help,
    /// Delete an instance.
    Delete,
    /// Materialize an instance and deploy bundles into it.
    Deploy,
    /// Load an existing instance and run the container.
    Start,
    /// Deploy and start in one invocation.
    Launch,
    /// Ask a running instance to stop.
    Stop,
}

impl Command {
    /// Parses a command verb.
    pub fn parse(verb: &str) -> Option<Self> {
        match verb {
            "help" => Some(Command::Help),
            "delete" => Some(Command::Delete),
            "deploy" => Some(Command::Deploy),
            "start" => Some(Command::Start),
            "launch" => Some(Command::Launch),
            "stop" => Some(Command::Stop),
            _ => None,
        }
    }
}

/// Applies configured system properties to the process environment.
///
/// The indirection keeps global effects out of the command logic, so tests
/// substitute a recording no-op.
pub trait SystemEffects {
    /// Sets the property of the given name to the value.
    fn set_property(&self, name: &str, value: &str);
}

/// System effects that change nothing. Useful for tests and for commands
/// that must not touch the environment.
pub struct NullEffects;

impl SystemEffects for NullEffects {
    fn set_property(&self, _name: &str, _value: &str) {}
}

struct ExecutionState {
    cancelled: bool,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

/// The one-shot execution gate of a command.
///
/// A cancellation request flips the gate and runs the registered handler
/// exactly once; later requests are no-ops. Registering a handler after
/// the cancellation reports it, so the caller can avoid entering the
/// long-running phase.
#[derive(Clone)]
pub struct Execution {
    state: Arc<Mutex<ExecutionState>>,
}

impl Execution {
    /// Creates a fresh gate.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ExecutionState {
                cancelled: false,
                on_cancel: None,
            })),
        }
    }

    /// Requests cancelling the command.
    pub fn cancel(&self) {
        let handler = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.cancelled = true;
            state.on_cancel.take()
        };

        if let Some(handler) = handler {
            debug!("cancellation handler starting");
            handler();
            debug!("cancellation handler finished");
        }
    }

    /// Returns `true` if the command was cancelled.
    pub fn cancelled(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).cancelled
    }

    /// Sets the cancellation handler.
    ///
    /// Returns `true` if the cancellation occurred already, in which case
    /// the handler is dropped without running and the caller should abort.
    pub fn on_cancel(&self, handler: Box<dyn FnOnce() + Send>) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.cancelled {
            return true;
        }

        state.on_cancel = Some(handler);
        false
    }

    /// Drops the registered cancellation handler.
    pub fn clear_cancel(&self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .on_cancel
            .take();
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self::new()
    }
}

/// Executes the command with the given arguments.
pub fn execute(
    command: Command,
    args: &[String],
    factory: &dyn ContainerFactory,
    effects: &dyn SystemEffects,
    execution: &Execution,
) -> Result<()> {
    if execution.cancelled() {
        return Err(Error::Cancelled);
    }

    let result = match command {
        Command::Help => {
            print!("{}", usage());
            Ok(())
        }
        Command::Delete => delete::run(args),
        Command::Deploy => deploy::run(args, factory, effects),
        Command::Start => start::run(args, factory, effects, execution),
        Command::Launch => launch::run(args, factory, effects, execution),
        Command::Stop => stop::run(args),
    };

    execution.clear_cancel();

    if execution.cancelled()
        && let Err(ref e) = result
    {
        // A failure after the cancellation is the expected outcome
        warn!("command failed after being cancelled: {e}");
        return Err(Error::Cancelled);
    }

    result
}

/// Returns the usage description.
pub fn usage() -> String {
    let text = r#"Usage: modrun COMMAND [OPTIONS]

Commands:
  help
      Print this description.

  delete INSTANCE
      Delete the given instance.

  deploy [OPTIONS] INSTANCE
      Create or update the instance and deploy bundles into it.

  start [OPTIONS] INSTANCE
      Run the container of an existing instance.

  launch [OPTIONS] INSTANCE [-- PARAMETERS]
      Deploy and start the instance in one invocation.

  stop INSTANCE
  stop HOST PORT SECRET
      Ask a running instance to stop via its command link.

Options:
  -b, --bundles PATH            add a bundle source directory
  -B, --bundle-store PATH       add a directory of bundle sources
  -c, --create-configuration DIR
                                seed conf/ when it does not exist yet
  -u, --update-configuration DIR
                                overlay conf/ always
  -f, --framework-properties FILE
  -F, --framework-property NAME VALUE
  -l, --launching-properties FILE
  -L, --launching-property NAME VALUE
  -s, --system-properties FILE
  -S, --system-property NAME VALUE
                                merge the respective properties
  -a, --command-address HOST PORT
                                listen for commands (start, launch)
  -t, --command-secret SECRET   protect the command link
  -U, --uninstall-bundles LOCATION
                                uninstall bundles matching the location glob
      --clean-instance [BOOL]   wipe the instance before deploying
      --clean-configuration [BOOL]
                                wipe conf/ before deploying
      --skip-deploy [BOOL]      launch: skip the deploy phase
      --skip-start [BOOL]       launch: skip the start phase
      --dump-status [BOOL]      print the detailed status
"#;

    text.to_string()
}
