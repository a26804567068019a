//! Steps of the Android device setup workflow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::InsightsError;

/// Every step the setup workflow can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AndroidSetupStepId {
    /// Waiting for the user to begin
    WaitToStart,
    /// Checking whether the adb location is known
    DetectAdb,
    /// Asking the user where adb is
    PromptLocateAdb,
    /// Listing connected devices
    DetectDevices,
    /// No device found; asking the user to connect one
    PromptConnectToDevice,
    /// Asking the user to pick a device
    PromptChooseDevice,
    /// Checking the service version on the device
    DetectService,
    /// Asking to install the service
    PromptInstallService,
    /// Installing the service
    InstallingService,
    /// Install failed
    PromptInstallFailed,
    /// Checking service permissions
    DetectPermissions,
    /// Asking the user to grant permissions
    PromptGrantPermissions,
    /// Setting up TCP forwarding and reading the device config
    ConfiguringPortForwarding,
    /// Forwarding or config fetch failed
    PromptConfiguringPortForwardingFailed,
    /// Ready to test
    PromptConnectedStartTesting,
}

impl AndroidSetupStepId {
    /// All steps in workflow order
    pub const ALL: [Self; 15] = [
        Self::WaitToStart,
        Self::DetectAdb,
        Self::PromptLocateAdb,
        Self::DetectDevices,
        Self::PromptConnectToDevice,
        Self::PromptChooseDevice,
        Self::DetectService,
        Self::PromptInstallService,
        Self::InstallingService,
        Self::PromptInstallFailed,
        Self::DetectPermissions,
        Self::PromptGrantPermissions,
        Self::ConfiguringPortForwarding,
        Self::PromptConfiguringPortForwardingFailed,
        Self::PromptConnectedStartTesting,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitToStart => "wait-to-start",
            Self::DetectAdb => "detect-adb",
            Self::PromptLocateAdb => "prompt-locate-adb",
            Self::DetectDevices => "detect-devices",
            Self::PromptConnectToDevice => "prompt-connect-to-device",
            Self::PromptChooseDevice => "prompt-choose-device",
            Self::DetectService => "detect-service",
            Self::PromptInstallService => "prompt-install-service",
            Self::InstallingService => "installing-service",
            Self::PromptInstallFailed => "prompt-install-failed",
            Self::DetectPermissions => "detect-permissions",
            Self::PromptGrantPermissions => "prompt-grant-permissions",
            Self::ConfiguringPortForwarding => "configuring-port-forwarding",
            Self::PromptConfiguringPortForwardingFailed => {
                "prompt-configuring-port-forwarding-failed"
            }
            Self::PromptConnectedStartTesting => "prompt-connected-start-testing",
        }
    }
}

impl fmt::Display for AndroidSetupStepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AndroidSetupStepId {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| InsightsError::device_setup(format!("unknown setup step: {s}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        for step in AndroidSetupStepId::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{step}\""));
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "configuring-port-forwarding".parse::<AndroidSetupStepId>().unwrap(),
            AndroidSetupStepId::ConfiguringPortForwarding
        );
        assert!("detect-everything".parse::<AndroidSetupStepId>().is_err());
    }
}
