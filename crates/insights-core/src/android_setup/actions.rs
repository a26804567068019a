//! Actions the setup UI can send.

use serde::{Deserialize, Serialize};

use super::deps::DeviceInfo;
use crate::state_machine::Action;

/// An action sent to the setup workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "kebab-case")]
pub enum AndroidSetupAction {
    /// Go back or give up on the current prompt
    Cancel,
    /// Continue from the current prompt
    Next,
    /// Look for devices again
    Rescan,
    /// The user located adb
    SaveAdbPath(String),
    /// The user picked a device
    SetSelectedDevice(DeviceInfo),
    /// The user wants to begin setup
    ReadyToStart,
}

/// Payload-free discriminant of [`AndroidSetupAction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AndroidSetupActionKind {
    /// [`AndroidSetupAction::Cancel`]
    Cancel,
    /// [`AndroidSetupAction::Next`]
    Next,
    /// [`AndroidSetupAction::Rescan`]
    Rescan,
    /// [`AndroidSetupAction::SaveAdbPath`]
    SaveAdbPath,
    /// [`AndroidSetupAction::SetSelectedDevice`]
    SetSelectedDevice,
    /// [`AndroidSetupAction::ReadyToStart`]
    ReadyToStart,
}

impl Action for AndroidSetupAction {
    type Kind = AndroidSetupActionKind;

    fn kind(&self) -> AndroidSetupActionKind {
        match self {
            Self::Cancel => AndroidSetupActionKind::Cancel,
            Self::Next => AndroidSetupActionKind::Next,
            Self::Rescan => AndroidSetupActionKind::Rescan,
            Self::SaveAdbPath(_) => AndroidSetupActionKind::SaveAdbPath,
            Self::SetSelectedDevice(_) => AndroidSetupActionKind::SetSelectedDevice,
            Self::ReadyToStart => AndroidSetupActionKind::ReadyToStart,
        }
    }
}
