//! Command line argument parsing.
//!
//! Options come in long `--name` and short `-n` forms with values as
//! separate tokens. Boolean options accept an optional literal `true` or
//! `false`; absence of the literal means `true`. A bare `--` ends option
//! processing.

use crate::config::{BundleSource, Configuration};
use crate::error::{Error, Result};
use crate::properties::PropertiesFile;
use std::path::PathBuf;

/// A cursor over the argument list.
#[derive(Debug)]
pub struct Arguments {
    arguments: Vec<String>,
    position: usize,
}

impl Arguments {
    /// Creates a new instance over the given arguments.
    pub fn new(arguments: &[String]) -> Self {
        Self {
            arguments: arguments.to_vec(),
            position: 0,
        }
    }

    /// Tests if an argument looks like an option.
    pub fn is_option(argument: &str) -> bool {
        argument.starts_with('-')
    }

    /// Moves to the next argument if possible.
    pub fn next(&mut self) -> &mut Self {
        if self.position < self.arguments.len() {
            self.position += 1;
        }

        self
    }

    /// Returns the current argument if any.
    pub fn current(&self) -> Option<&str> {
        self.arguments.get(self.position).map(String::as_str)
    }

    /// Returns the current argument if it looks like an option.
    pub fn option(&self) -> Option<&str> {
        self.current().filter(|argument| Self::is_option(argument))
    }

    /// Returns the current argument as a boolean if it is a `true` or
    /// `false` literal, case-insensitive.
    pub fn option_switch(&self) -> Option<bool> {
        match self.current()?.to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Returns the remaining arguments.
    pub fn remaining(&self) -> &[String] {
        &self.arguments[self.position.min(self.arguments.len())..]
    }

    /// Returns the current argument, failing with the given argument name
    /// when there are no more arguments.
    pub fn require(&self, name: &str) -> Result<String> {
        self.current()
            .map(String::from)
            .ok_or_else(|| Error::Syntax(format!("missing required argument {name}")))
    }
}

/// The options recognized by the deploy, start and launch commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOption {
    BundleStore,
    Bundles,
    CleanConfiguration,
    CleanInstance,
    CommandAddress,
    CommandSecret,
    CreateConfiguration,
    DumpStatus,
    FrameworkProperties,
    FrameworkProperty,
    LaunchingProperties,
    LaunchingProperty,
    SkipDeploy,
    SkipStart,
    SystemProperties,
    SystemProperty,
    UninstallBundles,
    UpdateConfiguration,
}

impl ConfigOption {
    /// All options, as the launch command accepts them.
    pub const ALL: &'static [ConfigOption] = &[
        ConfigOption::BundleStore,
        ConfigOption::Bundles,
        ConfigOption::CleanConfiguration,
        ConfigOption::CleanInstance,
        ConfigOption::CommandAddress,
        ConfigOption::CommandSecret,
        ConfigOption::CreateConfiguration,
        ConfigOption::DumpStatus,
        ConfigOption::FrameworkProperties,
        ConfigOption::FrameworkProperty,
        ConfigOption::LaunchingProperties,
        ConfigOption::LaunchingProperty,
        ConfigOption::SkipDeploy,
        ConfigOption::SkipStart,
        ConfigOption::SystemProperties,
        ConfigOption::SystemProperty,
        ConfigOption::UninstallBundles,
        ConfigOption::UpdateConfiguration,
    ];

    /// The options the deploy command accepts.
    pub const DEPLOY: &'static [ConfigOption] = &[
        ConfigOption::BundleStore,
        ConfigOption::Bundles,
        ConfigOption::CleanConfiguration,
        ConfigOption::CleanInstance,
        ConfigOption::CreateConfiguration,
        ConfigOption::DumpStatus,
        ConfigOption::FrameworkProperties,
        ConfigOption::FrameworkProperty,
        ConfigOption::LaunchingProperties,
        ConfigOption::LaunchingProperty,
        ConfigOption::SystemProperties,
        ConfigOption::SystemProperty,
        ConfigOption::UninstallBundles,
        ConfigOption::UpdateConfiguration,
    ];

    /// The options the start command accepts.
    pub const START: &'static [ConfigOption] = &[
        ConfigOption::CommandAddress,
        ConfigOption::CommandSecret,
        ConfigOption::DumpStatus,
        ConfigOption::FrameworkProperties,
        ConfigOption::FrameworkProperty,
        ConfigOption::LaunchingProperties,
        ConfigOption::LaunchingProperty,
        ConfigOption::SystemProperties,
        ConfigOption::SystemProperty,
    ];

    /// The recognized names of the option.
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            ConfigOption::BundleStore => &["--bundle-store", "-B"],
            ConfigOption::Bundles => &["--bundles", "-b"],
            ConfigOption::CleanConfiguration => &["--clean-configuration"],
            ConfigOption::CleanInstance => &["--clean-instance"],
            ConfigOption::CommandAddress => &["--command-address", "-a"],
            ConfigOption::CommandSecret => &["--command-secret", "-t"],
            ConfigOption::CreateConfiguration => &["--create-configuration", "-c"],
            ConfigOption::DumpStatus => &["--dump-status"],
            ConfigOption::FrameworkProperties => &["--framework-properties", "-f"],
            ConfigOption::FrameworkProperty => &["--framework-property", "-F"],
            ConfigOption::LaunchingProperties => &["--launching-properties", "-l"],
            ConfigOption::LaunchingProperty => &["--launching-property", "-L"],
            ConfigOption::SkipDeploy => &["--skip-deploy"],
            ConfigOption::SkipStart => &["--skip-start"],
            ConfigOption::SystemProperties => &["--system-properties", "-s"],
            ConfigOption::SystemProperty => &["--system-property", "-S"],
            ConfigOption::UninstallBundles => &["--uninstall-bundles", "-U"],
            ConfigOption::UpdateConfiguration => &["--update-configuration", "-u"],
        }
    }

    /// Handles the option with the arguments positioned past its name.
    fn handle(&self, args: &mut Arguments, result: &mut Configuration) -> Result<()> {
        match self {
            ConfigOption::BundleStore => {
                let path = PathBuf::from(args.require("PATH")?);
                result.bundles.push(BundleSource::Store(path));
                args.next();
            }
            ConfigOption::Bundles => {
                let path = PathBuf::from(args.require("PATH")?);
                result.bundles.push(BundleSource::Source(path));
                args.next();
            }
            ConfigOption::CleanConfiguration => {
                result.clean_configuration = switch_value(args);
            }
            ConfigOption::CleanInstance => {
                result.clean_instance = switch_value(args);
            }
            ConfigOption::CommandAddress => {
                let host = args.require("HOST")?;
                let port = args.next().require("PORT")?;
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::Syntax(format!("invalid port: {port}")))?;
                result.command_address = Some((host, port));
                args.next();
            }
            ConfigOption::CommandSecret => {
                result.command_secret = args.require("SECRET")?;
                args.next();
            }
            ConfigOption::CreateConfiguration => {
                let dir = PathBuf::from(args.require("DIR")?);
                result.create_configuration.push(dir);
                args.next();
            }
            ConfigOption::DumpStatus => {
                result.dump_status = switch_value(args);
            }
            ConfigOption::FrameworkProperties => {
                merge_properties(&mut result.properties.framework, args)?;
            }
            ConfigOption::FrameworkProperty => {
                merge_property(&mut result.properties.framework, args)?;
            }
            ConfigOption::LaunchingProperties => {
                merge_properties(&mut result.properties.launching, args)?;
            }
            ConfigOption::LaunchingProperty => {
                merge_property(&mut result.properties.launching, args)?;
            }
            ConfigOption::SkipDeploy => {
                result.skip_deploy = switch_value(args);
            }
            ConfigOption::SkipStart => {
                result.skip_start = switch_value(args);
            }
            ConfigOption::SystemProperties => {
                merge_properties(&mut result.properties.system, args)?;
            }
            ConfigOption::SystemProperty => {
                merge_property(&mut result.properties.system, args)?;
            }
            ConfigOption::UninstallBundles => {
                result.uninstall_bundles.push(args.require("LOCATION")?);
                args.next();
            }
            ConfigOption::UpdateConfiguration => {
                let dir = PathBuf::from(args.require("DIR")?);
                result.update_configuration.push(dir);
                args.next();
            }
        }

        Ok(())
    }
}

/// Parses the arguments of a configured command: options, then the
/// instance path, then the remaining parameters (an optional `--` between
/// the two is consumed).
pub fn parse_configuration(
    arguments: &[String],
    options: &[ConfigOption],
) -> Result<Configuration> {
    let mut result = Configuration::new();
    let mut args = Arguments::new(arguments);

    parse_options(&mut args, options, &mut result)?;

    result.instance = PathBuf::from(args.require("INSTANCE")?);
    args.next();

    if args.current() == Some("--") {
        args.next();
    }

    result.parameters.extend(args.remaining().iter().cloned());
    result.validate()?;
    Ok(result)
}

/// Consumes options from the arguments until a non-option token or a bare
/// `--` terminator is found.
fn parse_options(
    args: &mut Arguments,
    options: &[ConfigOption],
    result: &mut Configuration,
) -> Result<()> {
    while let Some(option) = args.option().map(String::from) {
        if option == "--" {
            args.next();
            break;
        }

        let found = options
            .iter()
            .find(|candidate| candidate.names().contains(&option.as_str()))
            .copied()
            .ok_or_else(|| Error::Syntax(format!("unknown option: {option}")))?;

        args.next();
        found.handle(args, result)?;
    }

    Ok(())
}

/// Reads the optional boolean literal of a switch option.
fn switch_value(args: &mut Arguments) -> bool {
    match args.option_switch() {
        Some(value) => {
            args.next();
            value
        }
        None => true,
    }
}

fn merge_properties(
    result: &mut std::collections::BTreeMap<String, String>,
    args: &mut Arguments,
) -> Result<()> {
    let file = PathBuf::from(args.require("FILE")?);
    args.next();
    PropertiesFile::required(file).merge_into(result)
}

fn merge_property(
    result: &mut std::collections::BTreeMap<String, String>,
    args: &mut Arguments,
) -> Result<()> {
    let name = args.require("NAME")?;
    let value = args.next().require("VALUE")?;
    args.next();
    result.insert(name, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_positional_and_parameters() {
        let parsed = parse_configuration(
            &strings(&["--dump-status", "inst", "--", "a", "b"]),
            ConfigOption::ALL,
        )
        .unwrap();

        assert!(parsed.dump_status);
        assert_eq!(parsed.instance, PathBuf::from("inst"));
        assert_eq!(parsed.parameters, strings(&["a", "b"]));
    }

    #[test]
    fn test_switch_literals() {
        let parsed = parse_configuration(
            &strings(&["--dump-status", "FALSE", "--clean-instance", "true", "inst"]),
            ConfigOption::ALL,
        )
        .unwrap();

        assert!(!parsed.dump_status);
        assert!(parsed.clean_instance);
    }

    #[test]
    fn test_two_value_options() {
        let parsed = parse_configuration(
            &strings(&[
                "--command-address",
                "localhost",
                "0",
                "--framework-property",
                "a",
                "1",
                "inst",
            ]),
            ConfigOption::ALL,
        )
        .unwrap();

        assert_eq!(parsed.command_address, Some(("localhost".to_string(), 0)));
        assert_eq!(parsed.properties.framework.get("a").unwrap(), "1");
    }

    #[test]
    fn test_unknown_option_refused() {
        let result = parse_configuration(&strings(&["--bogus", "inst"]), ConfigOption::ALL);
        assert!(matches!(result, Err(Error::Syntax(_))));
    }

    #[test]
    fn test_option_not_allowed_for_command() {
        let result = parse_configuration(
            &strings(&["--command-address", "localhost", "0", "inst"]),
            ConfigOption::DEPLOY,
        );
        assert!(matches!(result, Err(Error::Syntax(_))));
    }

    #[test]
    fn test_missing_instance_refused() {
        let result = parse_configuration(&strings(&["--dump-status"]), ConfigOption::ALL);
        assert!(result.is_err());
    }
}
