//! Common settings for deploying bundles.

use crate::container::Autostart;
use tracing::warn;

/// A deployment action to perform for a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    /// Uninstall the bundle when installed and no source is present.
    Uninstall,
    /// Update the bundle from its source when installed.
    Update,
    /// Install the bundle from its source when not installed yet.
    Install,
}

impl DeployAction {
    /// Bit assigned to the action. Uninstalls carry the lowest bit so that
    /// plans free locations before installing into them.
    fn bit(self) -> u8 {
        match self {
            DeployAction::Uninstall => 1,
            DeployAction::Update => 2,
            DeployAction::Install => 4,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "uninstall" => Some(DeployAction::Uninstall),
            "update" => Some(DeployAction::Update),
            "install" => Some(DeployAction::Install),
            _ => None,
        }
    }
}

/// A set of deployment actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionSet(u8);

impl ActionSet {
    /// Returns the empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` when no action is present.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Adds the action to the set.
    pub fn insert(&mut self, action: DeployAction) {
        self.0 |= action.bit();
    }

    /// Tests the presence of the action.
    pub fn contains(&self, action: DeployAction) -> bool {
        self.0 & action.bit() != 0
    }

    /// Returns the ordering rank of the set: the sum of the action bits.
    pub fn rank(&self) -> u8 {
        self.0
    }

    /// Parses a comma-separated, case-insensitive action list. Unknown
    /// items are reported and skipped.
    pub fn parse(value: &str) -> Self {
        let mut result = Self::empty();

        for item in value.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            match DeployAction::parse(item) {
                Some(action) => result.insert(action),
                None => warn!("could not parse deployment action: {item}"),
            }
        }

        result
    }
}

/// The common settings for deploying a bundle: the actions to perform, the
/// autostart intent and the start level, where zero start level means
/// "leave unchanged".
///
/// Fresh settings install new bundles and update existing ones; an
/// uninstall must be requested explicitly with the `deployment.action`
/// option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySettings {
    actions: ActionSet,
    autostart: Option<Autostart>,
    start_level: u32,
}

impl Default for DeploySettings {
    fn default() -> Self {
        let mut actions = ActionSet::empty();
        actions.insert(DeployAction::Install);
        actions.insert(DeployAction::Update);

        Self {
            actions,
            autostart: None,
            start_level: 0,
        }
    }
}

impl DeploySettings {
    /// Creates the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the actions to perform.
    pub fn actions(&self) -> ActionSet {
        self.actions
    }

    /// Sets the actions to perform.
    pub fn set_actions(&mut self, actions: ActionSet) {
        self.actions = actions;
    }

    /// Returns the autostart setting.
    pub fn autostart(&self) -> Option<Autostart> {
        self.autostart
    }

    /// Sets the autostart setting; `None` means no change required.
    pub fn set_autostart(&mut self, autostart: Option<Autostart>) {
        self.autostart = autostart;
    }

    /// Returns the start level, or zero for no change required.
    pub fn start_level(&self) -> u32 {
        self.start_level
    }

    /// Sets the start level; zero means no change required.
    pub fn set_start_level(&mut self, level: u32) {
        self.start_level = level;
    }

    /// Applies a signed start level value.
    ///
    /// A positive value sets the level and marks the bundle started, a
    /// negative value sets the negated level and marks it stopped, zero
    /// resets both. The integer minimum has no positive negation and is
    /// treated as zero.
    pub fn apply_start_level(&mut self, level: i32) {
        if level == 0 || level == i32::MIN {
            self.autostart = None;
            self.start_level = 0;
            return;
        }

        if level < 0 {
            self.autostart = Some(Autostart::Stopped);
            self.start_level = level.unsigned_abs();
            return;
        }

        self.autostart = Some(Autostart::Started);
        self.start_level = level as u32;
    }

    /// Applies the textual form of a start level; unparseable values are
    /// reported and treated as zero.
    pub fn apply_start_level_text(&mut self, value: &str) {
        let level = value.trim().parse::<i32>().unwrap_or_else(|_| {
            warn!("could not parse start level: {value}");
            0
        });

        self.apply_start_level(level);
    }
}
