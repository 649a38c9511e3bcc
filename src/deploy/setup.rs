//! Deployment plan composition from bundle sources.

use crate::constants::{
    DEFAULT_BUNDLE_SUFFIX, DEPLOYMENT_PROPERTIES, PROPERTY_BUNDLE_LOCATION_ROOT,
    PROPERTY_DEPLOYMENT_ACTION, PROPERTY_DEPLOYMENT_SEARCH, PROPERTY_START_LEVEL,
    SCOPED_BUNDLE_LOCATION, SCOPED_DEPLOYMENT_ACTION, SCOPED_START_LEVEL,
};
use crate::deploy::plan::DeploymentPlan;
use crate::deploy::settings::{ActionSet, DeploySettings};
use crate::deploy::source::FileSource;
use crate::error::{Error, Result};
use crate::fsutil;
use crate::glob::{PathPattern, best_matches};
use crate::properties::PropertiesFile;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Composes a deployment plan from bundle sources.
///
/// A bundle source is a directory, optionally carrying a
/// `deployment.properties` file with defaults and per-bundle overrides, or
/// such a properties file directly (its parent directory then provides the
/// bundles). Sources are processed in the order they are configured.
pub struct DeploymentSetup {
    plan: DeploymentPlan,
}

impl DeploymentSetup {
    /// Creates a new instance with an empty plan.
    pub fn new() -> Self {
        Self {
            plan: DeploymentPlan::new(),
        }
    }

    /// Configures the default settings from the given properties.
    pub fn configure_defaults(&mut self, defaults: &BTreeMap<String, String>) {
        configure_settings(self.plan.defaults_mut(), defaults);
    }

    /// Configures a bundle source from the given path.
    ///
    /// If the path points to a file, the file is read as the source options
    /// and its parent directory provides the bundles. Otherwise the path
    /// must be the source directory, which may contain a
    /// `deployment.properties` file with the options.
    pub fn configure_source(&mut self, path: &Path) -> Result<()> {
        let (location, file) = if path.parent().is_none() || path.is_dir() {
            let location = fsutil::normalize(path);
            let file = PropertiesFile::optional(location.join(DEPLOYMENT_PROPERTIES));
            (location, file)
        } else {
            let file = PropertiesFile::optional(fsutil::normalize(path));
            let location = file
                .path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            (location, file)
        };

        if file.exists() {
            debug!("loading deployment options: {}", file.path().display());
        } else {
            debug!(
                "deployment options not found, using defaults instead: {}",
                file.path().display()
            );
        }

        let properties = file.load()?;
        self.configure_location(&location, &properties)
    }

    /// Configures a bundle source with explicitly provided options.
    pub fn configure_location(
        &mut self,
        location: &Path,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        info!("processing deployment location: {}", location.display());

        if !location.is_dir() {
            return Err(Error::Config(format!(
                "location is not a directory: {}",
                location.display()
            )));
        }

        let root = self.define_location(location, properties);
        let mut defined = Vec::new();

        self.discover_bundles(location, &root, properties, &mut defined)?;
        self.redefine_bundles(location, &root, properties, &mut defined);
        self.apply_scoped_settings(&defined, properties)?;

        Ok(())
    }

    /// Returns the composed plan.
    pub fn into_plan(self) -> DeploymentPlan {
        self.plan
    }

    /// Defines the location root and loads its settings from the options.
    fn define_location(&mut self, location: &Path, properties: &BTreeMap<String, String>) -> String {
        let root = location_root(location, properties);
        let settings = self.plan.location(&root);
        configure_settings(settings, properties);
        root
    }

    /// Discovers bundles present in the source directory.
    fn discover_bundles(
        &mut self,
        location: &Path,
        root: &str,
        properties: &BTreeMap<String, String>,
        defined: &mut Vec<(String, String)>,
    ) -> Result<()> {
        let filter = search_filter(properties.get(PROPERTY_DEPLOYMENT_SEARCH))?;
        let mut found = Vec::new();
        collect_files(location, location, &mut found)?;

        let mut paths: Vec<Vec<String>> = found
            .iter()
            .map(|path| uniform_components(path))
            .filter(|components| filter(&components.join("/")))
            .collect();

        // Order as a BFS traversal would: by depth, then per component
        paths.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        for components in paths {
            let uniform = components.join("/");
            let bundle_location = custom_location(properties, &uniform)
                .unwrap_or_else(|| format!("{root}{uniform}"));

            let source = FileSource::new(location.join(components.join(std::path::MAIN_SEPARATOR_STR)));
            self.plan
                .bundle(&bundle_location)
                .set_source(Some(Box::new(source)));

            defined.push((uniform, bundle_location));
        }

        Ok(())
    }

    /// Defines bundles and redefines existing definitions using the
    /// per-bundle location overrides. An override naming a file that does
    /// not exist defines a bundle with no source, which makes an explicit
    /// uninstall target.
    fn redefine_bundles(
        &mut self,
        location: &Path,
        root: &str,
        properties: &BTreeMap<String, String>,
        defined: &mut Vec<(String, String)>,
    ) {
        for (name, _) in properties.iter() {
            let Some(bundle_path) = name.strip_prefix(SCOPED_BUNDLE_LOCATION) else {
                continue;
            };

            if bundle_path.is_empty() {
                warn!("invalid property: {name}");
                continue;
            }

            let uniform = bundle_path.replace('\\', "/");
            let file_path = location.join(uniform.split('/').collect::<PathBuf>());
            let bundle_location =
                custom_location(properties, &uniform).unwrap_or_else(|| format!("{root}{uniform}"));

            let source: Option<Box<dyn crate::deploy::StreamSource>> = file_path
                .exists()
                .then(|| Box::new(FileSource::new(file_path)) as Box<dyn crate::deploy::StreamSource>);

            self.plan.bundle(&bundle_location).set_source(source);

            if !defined.iter().any(|(known, _)| *known == uniform) {
                defined.push((uniform, bundle_location));
            }
        }
    }

    /// Applies the scoped start level and action overrides to the defined
    /// bundles. Only an unambiguous best-ranking match applies; several
    /// matchers sharing the best ranking are a user error and apply none.
    fn apply_scoped_settings(
        &mut self,
        defined: &[(String, String)],
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        let matchers = scoped_matchers(properties)?;

        for (path, bundle_location) in defined {
            let matches = best_matches(&matchers, path);
            let Some(first) = matches.first() else {
                continue;
            };

            if matches.len() > 1 {
                let listing: Vec<&str> = matches.iter().map(|m| m.glob()).collect();
                warn!("bundle path '{path}' matching with multiple expressions: {listing:?}");
                continue;
            }

            let specifier = first.glob();
            let settings = self.plan.bundle(bundle_location).settings_mut();

            if let Some(value) = properties.get(&format!("{SCOPED_START_LEVEL}{specifier}")) {
                settings.apply_start_level_text(value);
            }
            if let Some(value) = properties.get(&format!("{SCOPED_DEPLOYMENT_ACTION}{specifier}")) {
                settings.set_actions(ActionSet::parse(value));
            }
        }

        Ok(())
    }
}

impl Default for DeploymentSetup {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the plain (unscoped) option keys to the settings.
fn configure_settings(settings: &mut DeploySettings, properties: &BTreeMap<String, String>) {
    if let Some(value) = properties.get(PROPERTY_DEPLOYMENT_ACTION) {
        settings.set_actions(ActionSet::parse(value));
    }

    if let Some(value) = properties.get(PROPERTY_START_LEVEL) {
        settings.apply_start_level_text(value);
    }
}

/// Resolves the location root string for deriving bundle locations.
fn location_root(location: &Path, properties: &BTreeMap<String, String>) -> String {
    match properties.get(PROPERTY_BUNDLE_LOCATION_ROOT) {
        None => location_uri(location),
        Some(root) if root.is_empty() => location_uri(location),
        Some(root) if root.ends_with('/') || root.ends_with(':') => root.clone(),
        Some(root) => format!("{root}/"),
    }
}

/// Returns a `file:` URI for the given directory, ending with a slash.
fn location_uri(location: &Path) -> String {
    let absolute = fsutil::absolute_path(location);
    let uniform = uniform_components(&absolute).join("/");
    format!("file:///{uniform}/")
}

/// Builds the matcher list from all scoped keys, most specific first.
fn scoped_matchers(properties: &BTreeMap<String, String>) -> Result<Vec<PathPattern>> {
    let mut globs: Vec<&str> = properties
        .keys()
        .filter_map(|name| {
            name.strip_prefix(SCOPED_START_LEVEL)
                .or_else(|| name.strip_prefix(SCOPED_DEPLOYMENT_ACTION))
        })
        .collect();

    globs.sort_unstable();
    globs.dedup();

    let mut matchers = globs
        .into_iter()
        .map(PathPattern::new)
        .collect::<Result<Vec<_>>>()?;

    matchers.sort();
    Ok(matchers)
}

fn custom_location(properties: &BTreeMap<String, String>, uniform: &str) -> Option<String> {
    properties
        .get(&format!("{SCOPED_BUNDLE_LOCATION}{uniform}"))
        .filter(|value| !value.is_empty())
        .cloned()
}

/// Compiles the bundle search filter.
///
/// Without an explicit filter the default accepts file names with the
/// `.jar` suffix (and more than just the suffix). An explicit filter is a
/// glob over the uniform relative path where `*` does not cross `/`.
fn search_filter(pattern: Option<&String>) -> Result<Box<dyn Fn(&str) -> bool>> {
    let Some(pattern) = pattern else {
        return Ok(Box::new(|path: &str| {
            let name = path.rsplit('/').next().unwrap_or(path);
            name.len() > DEFAULT_BUNDLE_SUFFIX.len() && name.ends_with(DEFAULT_BUNDLE_SUFFIX)
        }));
    };

    let glob = globset::GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::Config(format!("invalid path filter '{pattern}': {e}")))?
        .compile_matcher();

    Ok(Box::new(move |path: &str| glob.is_match(path)))
}

/// Collects regular files under the root, depth first.
fn collect_files(root: &Path, dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            collect_files(root, &path, found)?;
        } else if path.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            found.push(relative.to_path_buf());
        }
    }

    Ok(())
}

/// Splits a path into its normal components in the platform independent
/// form.
fn uniform_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_root_forms() {
        let empty = BTreeMap::new();
        let dir = Path::new("/tmp");
        assert!(location_root(dir, &empty).starts_with("file:///"));
        assert!(location_root(dir, &empty).ends_with('/'));

        let mut verbatim = BTreeMap::new();
        verbatim.insert(PROPERTY_BUNDLE_LOCATION_ROOT.to_string(), "mem:".to_string());
        assert_eq!(location_root(dir, &verbatim), "mem:");

        let mut appended = BTreeMap::new();
        appended.insert(
            PROPERTY_BUNDLE_LOCATION_ROOT.to_string(),
            "https://repo/bundles".to_string(),
        );
        assert_eq!(location_root(dir, &appended), "https://repo/bundles/");
    }

    #[test]
    fn test_default_search_filter() {
        let filter = search_filter(None).unwrap();
        assert!(filter("testing/testing-1.0.0.jar"));
        assert!(!filter("testing/.jar"));
        assert!(!filter("testing/readme.txt"));
    }

    #[test]
    fn test_explicit_search_filter_respects_separators() {
        let pattern = "*.jar".to_string();
        let filter = search_filter(Some(&pattern)).unwrap();
        assert!(filter("a.jar"));
        assert!(!filter("sub/a.jar"));
    }
}
