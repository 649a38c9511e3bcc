//! Bundle deployment planning.
//!
//! A deployment plan is computed from bundle source directories and their
//! property files before any instance state is touched. The plan captures,
//! per bundle location, the actions to perform, the start level and
//! autostart intent, and an optional byte-stream source; materializing the
//! plan yields a deterministic execution order.

mod plan;
mod settings;
mod setup;
mod source;

pub use plan::{BundleDeployment, DeploymentPlan};
pub use settings::{ActionSet, DeployAction, DeploySettings};
pub use setup::DeploymentSetup;
pub use source::{FileSource, StreamSource};
