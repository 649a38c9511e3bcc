//! modrun - module-container launcher CLI
//!
//! ```sh
//! modrun deploy --bundles <dir> <instance>
//! modrun start --command-address localhost 0 <instance>
//! modrun launch --bundles <dir> <instance> [-- parameters...]
//! modrun stop <instance>
//! modrun delete <instance>
//! ```
//!
//! Logging is configured from the environment: `MODRUN_LOGGING_LEVEL`
//! selects `FORCE`, `ERROR`, `WARN`, `INFO` or `DEBUG`, and
//! `MODRUN_LOGGING_FILE` selects `stderr` (default), `stdout` or a path.

use modrun::commands::{self, Command, Execution, SystemEffects};
use modrun::constants::{ENV_LOGGING_FILE, ENV_LOGGING_LEVEL};
use modrun::error::{EXIT_FAULT, EXIT_SUCCESS, EXIT_SYNTAX};
use modrun::runtimes::StoreContainerFactory;
use std::fs::File;
use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Applies configured system properties to the process environment.
struct EnvEffects;

impl SystemEffects for EnvEffects {
    fn set_property(&self, name: &str, value: &str) {
        // SAFETY: system properties are applied at the very beginning of a
        // command, before the container and its threads read the
        // environment; the signal hook never touches it.
        unsafe { std::env::set_var(name, value) };
    }
}

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let Some(verb) = args.first() else {
        eprint!("{}", commands::usage());
        return ExitCode::from(EXIT_SYNTAX as u8);
    };

    let Some(command) = Command::parse(verb) else {
        eprintln!("Unknown command: {verb}");
        eprint!("{}", commands::usage());
        return ExitCode::from(EXIT_SYNTAX as u8);
    };

    let execution = Execution::new();

    {
        let execution = execution.clone();
        if let Err(e) = ctrlc::set_handler(move || execution.cancel()) {
            error!("could not install the signal handler: {e}");
        }
    }

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        commands::execute(
            command,
            &args[1..],
            &StoreContainerFactory,
            &EnvEffects,
            &execution,
        )
    }));

    match outcome {
        Ok(Ok(())) => ExitCode::from(EXIT_SUCCESS as u8),
        Ok(Err(modrun::Error::Cancelled)) => {
            info!("command cancelled");
            ExitCode::from(EXIT_SUCCESS as u8)
        }
        Ok(Err(e)) => {
            error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
        Err(_) => {
            error!("command failed unexpectedly");
            ExitCode::from(EXIT_FAULT as u8)
        }
    }
}

/// Initializes the tracing subscriber from the environment variables.
fn init_logging() {
    let level = std::env::var(ENV_LOGGING_LEVEL).unwrap_or_default();
    let filter = match level.to_ascii_uppercase().as_str() {
        "FORCE" | "ERROR" => "error",
        "WARN" => "warn",
        "DEBUG" => "debug",
        _ => "info",
    };

    let filter = EnvFilter::new(format!("modrun={filter}"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match std::env::var(ENV_LOGGING_FILE).as_deref() {
        Ok("stdout") => builder.with_writer(std::io::stdout).init(),
        Ok("stderr") | Err(_) => builder.with_writer(std::io::stderr).init(),
        Ok(path) => match File::options().create(true).append(true).open(path) {
            Ok(file) => builder.with_writer(Arc::new(file)).init(),
            Err(e) => {
                eprintln!("Could not open the log file {path}: {e}");
                builder.with_writer(std::io::stderr).init();
            }
        },
    }
}
