//! App-wide settings held in [`StateStore`](crate::StateStore)s: feature
//! flags and user configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A switchable feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeatureFlag {
    /// Automated tab-stop result collection
    TabStopsAutomation,
    /// Android setup through adb
    AdbSetupView,
}

impl FeatureFlag {
    /// Name used in flag maps
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TabStopsAutomation => "tabStopsAutomation",
            Self::AdbSetupView => "adbSetupView",
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature flag values; a flag never set is off
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureFlagStoreData(BTreeMap<FeatureFlag, bool>);

impl FeatureFlagStoreData {
    /// Whether `flag` is on
    #[must_use]
    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.0.get(&flag).copied().unwrap_or(false)
    }

    /// Turn `flag` on or off
    pub fn set(&mut self, flag: FeatureFlag, enabled: bool) {
        self.0.insert(flag, enabled);
    }

    /// Builder form of [`set`](Self::set)
    #[must_use]
    pub fn with(mut self, flag: FeatureFlag, enabled: bool) -> Self {
        self.set(flag, enabled);
        self
    }
}

impl FromIterator<(FeatureFlag, bool)> for FeatureFlagStoreData {
    fn from_iter<I: IntoIterator<Item = (FeatureFlag, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-user configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfigurationStoreData {
    /// The user has not been through first-run consent yet
    pub is_first_time: bool,
}

impl Default for UserConfigurationStoreData {
    fn default() -> Self {
        Self {
            is_first_time: true,
        }
    }
}
