//! Deployment plan assembly and ordering.

use crate::deploy::settings::DeploySettings;
use crate::deploy::source::StreamSource;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Deployment of a single bundle: a unique location, the inherited
/// settings and an optional archive source.
pub struct BundleDeployment {
    location: String,
    settings: DeploySettings,
    source: Option<Box<dyn StreamSource>>,
}

impl BundleDeployment {
    fn new(location: String, settings: DeploySettings) -> Self {
        Self {
            location,
            settings,
            source: None,
        }
    }

    /// Returns the location of the bundle.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the deployment settings.
    pub fn settings(&self) -> &DeploySettings {
        &self.settings
    }

    /// Returns the deployment settings for updating.
    pub fn settings_mut(&mut self) -> &mut DeploySettings {
        &mut self.settings
    }

    /// Returns the archive source if present.
    pub fn source(&self) -> Option<&dyn StreamSource> {
        self.source.as_deref()
    }

    /// Sets the archive source; `None` marks the absence of a source.
    pub fn set_source(&mut self, source: Option<Box<dyn StreamSource>>) {
        self.source = source;
    }
}

impl std::fmt::Debug for BundleDeployment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleDeployment")
            .field("location", &self.location)
            .field("settings", &self.settings)
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .finish()
    }
}

/// A deployment under construction and its materialized form.
///
/// The plan is built by refining the default settings, defining location
/// roots and binding bundles. A bundle binding inherits, at creation time,
/// the settings of the longest location root prefixing its location, or
/// the defaults when no root matches. Settings captured by a binding stay
/// with it even when the defaults change later.
#[derive(Default)]
pub struct DeploymentPlan {
    defaults: DeploySettings,
    locations: Vec<(String, DeploySettings)>,
    bundles: HashMap<String, BundleDeployment>,
}

impl DeploymentPlan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default settings used for creating new locations and
    /// for bundles bound to no location.
    pub fn defaults(&self) -> &DeploySettings {
        &self.defaults
    }

    /// Returns the default settings for updating.
    pub fn defaults_mut(&mut self) -> &mut DeploySettings {
        &mut self.defaults
    }

    /// Returns the settings of the given location root, creating them from
    /// the current defaults when not defined yet. The roots stay sorted.
    pub fn location(&mut self, root: &str) -> &mut DeploySettings {
        match self
            .locations
            .binary_search_by(|(known, _)| known.as_str().cmp(root))
        {
            Ok(at) => &mut self.locations[at].1,
            Err(at) => {
                let inherited = self.defaults.clone();
                self.locations.insert(at, (root.to_string(), inherited));
                &mut self.locations[at].1
            }
        }
    }

    /// Returns the bundle deployment for the given location, creating it
    /// with the inherited settings when not defined yet.
    pub fn bundle(&mut self, location: &str) -> &mut BundleDeployment {
        let inherited = match self.bundles.contains_key(location) {
            true => DeploySettings::new(),
            false => self.inherited_settings(location),
        };

        self.bundles
            .entry(location.to_string())
            .or_insert_with(|| BundleDeployment::new(location.to_string(), inherited))
    }

    /// Returns `true` when the location has a bundle bound.
    pub fn contains(&self, location: &str) -> bool {
        self.bundles.contains_key(location)
    }

    /// Returns the bundle deployments in the deterministic execution order.
    pub fn bundles(&self) -> Vec<&BundleDeployment> {
        let mut result: Vec<&BundleDeployment> = self.bundles.values().collect();
        result.sort_by(|a, b| compare(a, b));
        result
    }

    /// Finds the settings of the longest location root prefixing the given
    /// location, falling back to the defaults.
    fn inherited_settings(&self, location: &str) -> DeploySettings {
        self.locations
            .iter()
            .filter(|(root, _)| location.starts_with(root.as_str()))
            .max_by_key(|(root, _)| root.len())
            .map(|(_, settings)| settings.clone())
            .unwrap_or_else(|| self.defaults.clone())
    }
}

impl std::fmt::Debug for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut locations: Vec<&String> = self.bundles.keys().collect();
        locations.sort();
        f.debug_struct("DeploymentPlan")
            .field("locations", &locations)
            .finish()
    }
}

/// Compares two bundle deployments with respect to the convenience of the
/// deployment procedure, so that the execution mitigates conflicts:
/// uninstalls run before installs, stopped bundles settle before started
/// ones, higher start levels come first and the location breaks ties.
pub fn compare(a: &BundleDeployment, b: &BundleDeployment) -> Ordering {
    let a_key = (
        a.settings().actions().rank(),
        autostart_key(a),
        level_key(a),
    );
    let b_key = (
        b.settings().actions().rank(),
        autostart_key(b),
        level_key(b),
    );

    a_key
        .cmp(&b_key)
        .then_with(|| a.location().cmp(b.location()))
}

fn autostart_key(deployment: &BundleDeployment) -> u8 {
    use crate::container::Autostart;

    match deployment.settings().autostart() {
        Some(Autostart::Stopped) => 0,
        Some(Autostart::Started) => 1,
        None => 2,
    }
}

fn level_key(deployment: &BundleDeployment) -> i64 {
    // Zero means "no change" and sorts last; other levels descend
    match deployment.settings().start_level() {
        0 => i64::MAX,
        level => -i64::from(level),
    }
}
