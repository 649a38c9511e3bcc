//! # modrun
//!
//! **Vendor-neutral module-container launcher**
//!
//! This crate supervises the lifecycle of a pluggable module-container
//! runtime and deploys a fleet of loadable bundles into it. The *deploy*
//! phase materializes an on-disk instance (installs, updates and
//! uninstalls bundles, persists the effective configuration) and the
//! *start* phase loads an existing instance and runs its container, so
//! images can be pre-built with all bundles already staged.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       commands (one-shot)                     │
//! │     help │ delete │ deploy │ start │ launch │ stop            │
//! ├───────────────────────────────────────────────────────────────┤
//! │  DeploymentSetup ──► DeploymentPlan                           │
//! │     sources + deployment.properties → ordered bundle ops      │
//! ├───────────────────────────────────────────────────────────────┤
//! │  InstanceControl                 InstanceRuntime              │
//! │     instance.lock ownership         property injection        │
//! │     etc/ conf/ data/ layout         instance.link lifecycle   │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ContainerRuntime                CommandServer / Sender       │
//! │     init → deploy → start           UDP + AES-128-CBC         │
//! │     wait-for-stop / restart         single receive thread     │
//! ├───────────────────────────────────────────────────────────────┤
//! │            Container / ContainerFactory traits                │
//! │        (host-supplied; StoreContainer as reference)           │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Instance Layout
//!
//! An instance is a directory that is an exclusive resource: at most one
//! process holds the advisory lock on its `instance.lock` at a time, and
//! all mutating operations require that hold. The `etc/` properties
//! reflect what was last deployed; `instance.link` exists exactly while a
//! command channel is bound.
//!
//! # Concurrency Model
//!
//! The control flow is deliberately synchronous. Besides the control
//! thread there are at most two others: the command-server receive thread
//! and the process signal hook, both of which only flag or kill the
//! running container through a shared mutex.
//!
//! # Example
//!
//! ```rust,ignore
//! use modrun::commands::{self, Command, Execution, NullEffects};
//! use modrun::runtimes::StoreContainerFactory;
//!
//! let execution = Execution::new();
//! commands::execute(
//!     Command::Deploy,
//!     &args,
//!     &StoreContainerFactory,
//!     &NullEffects,
//!     &execution,
//! )?;
//! ```

// =============================================================================
// Internal Modules
// =============================================================================

mod fsutil;

// =============================================================================
// Public Modules
// =============================================================================

pub mod args;
pub mod commands;
pub mod config;
pub mod constants;
pub mod container;
pub mod deploy;
pub mod error;
pub mod glob;
pub mod instance;
pub mod interpolate;
pub mod launcher;
pub mod lockfile;
pub mod properties;
pub mod remote;
pub mod runtime;
pub mod runtimes;
pub mod status;

pub use error::{Error, Result};
