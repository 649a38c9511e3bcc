//! Constants for the launcher.
//!
//! Instance layout names, recognized property keys and wire limits are
//! defined here to keep them consistent across modules.

// =============================================================================
// Instance Layout
// =============================================================================

/// Instance subdirectory with the user-writable configuration tree.
pub const CONF_PATH: &str = "conf";

/// Instance subdirectory with the storage area owned by the container.
pub const DATA_PATH: &str = "data";

/// Instance subdirectory where applied properties are stored.
pub const ETC_PATH: &str = "etc";

/// Name of the file whose advisory lock guards the instance.
pub const LOCK_FILE: &str = "instance.lock";

/// Name of the file exposing the command link parameters.
pub const COMMAND_LINK_FILE: &str = "instance.link";

/// Name of the file storing the container properties used for start.
pub const FRAMEWORK_PROPERTIES: &str = "framework.properties";

/// Name of the file storing the launching properties used for start.
pub const LAUNCHING_PROPERTIES: &str = "launching.properties";

/// Name of the file storing the system properties used for start.
pub const SYSTEM_PROPERTIES: &str = "system.properties";

// =============================================================================
// Reserved Property Keys
// =============================================================================

/// Property injected with the absolute instance path. User-supplied values
/// are ignored.
pub const PROPERTY_INSTANCE_ROOT: &str = "modrun.instance";

/// Property injected with the instance configuration path. User-supplied
/// values are ignored.
pub const PROPERTY_INSTANCE_CONF: &str = "modrun.instance.configuration";

/// Property with the container storage area. Injected only if absent.
pub const PROPERTY_CONTAINER_STORAGE: &str = "container.storage";

/// Property requesting a storage clean-up on initialization. Stripped from
/// the effective map on the start command to prevent data loss on restart.
pub const PROPERTY_CONTAINER_STORAGE_CLEAN: &str = "container.storage.clean";

/// Launching property with the shutdown timeout. The value is an ISO-8601
/// duration or `N UNIT` with unit `m`, `s` or `ms`; `none`, `null` or an
/// empty value means waiting forever.
pub const PROPERTY_SHUTDOWN_TIMEOUT: &str = "shutdown.timeout";

// =============================================================================
// Deployment Property Keys
// =============================================================================

/// Name of the per-source property file with deployment options.
pub const DEPLOYMENT_PROPERTIES: &str = "deployment.properties";

/// Property overriding the location root for derived bundle locations.
pub const PROPERTY_BUNDLE_LOCATION_ROOT: &str = "bundle.location.root";

/// Property with the comma-separated deployment actions.
pub const PROPERTY_DEPLOYMENT_ACTION: &str = "deployment.action";

/// Property with the glob filter for searching bundles to deploy.
pub const PROPERTY_DEPLOYMENT_SEARCH: &str = "deployment.search";

/// Property with the default start level.
pub const PROPERTY_START_LEVEL: &str = "start.level";

/// Prefix of the scoped bundle location override keys.
pub const SCOPED_BUNDLE_LOCATION: &str = "bundle.location@";

/// Prefix of the scoped deployment action keys.
pub const SCOPED_DEPLOYMENT_ACTION: &str = "deployment.action@";

/// Prefix of the scoped start level keys.
pub const SCOPED_START_LEVEL: &str = "start.level@";

/// Suffix accepted by the default bundle search filter.
pub const DEFAULT_BUNDLE_SUFFIX: &str = ".jar";

// =============================================================================
// Command Channel
// =============================================================================

/// The verb requesting an instance to stop.
pub const COMMAND_STOP: &str = "stop";

/// Maximum accepted length of a command datagram.
pub const MAX_PACKET_LENGTH: usize = 0xFFFF;

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable selecting the log sink: `stderr` (default),
/// `stdout`, or a file path.
pub const ENV_LOGGING_FILE: &str = "MODRUN_LOGGING_FILE";

/// Environment variable selecting the log level: `FORCE`, `ERROR`, `WARN`,
/// `INFO` or `DEBUG`.
pub const ENV_LOGGING_LEVEL: &str = "MODRUN_LOGGING_LEVEL";
