//! What the setup steps need from the outside world.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::step_id::AndroidSetupStepId;
use crate::result::InsightsResult;
use crate::state_machine::StepTransition;

/// A device reported by adb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// adb serial
    pub id: String,
    /// Name shown to the user
    pub friendly_name: String,
    /// Whether this is an emulator
    #[serde(default)]
    pub is_emulator: bool,
}

/// Configuration the on-device service reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// Name of the app in the foreground
    pub app_identifier: String,
}

/// Device access, implemented on top of adb outside this crate
#[async_trait]
pub trait AndroidSetupDeps: Send + Sync {
    /// Whether the adb location is known
    async fn has_adb_path(&self) -> bool;

    /// Remember the adb location
    fn set_adb_path(&self, path: &str);

    /// Devices currently visible to adb
    async fn get_devices(&self) -> InsightsResult<Vec<DeviceInfo>>;

    /// Target `id` in subsequent device calls
    fn set_selected_device_id(&self, id: &str);

    /// Whether the installed service has the expected version
    async fn has_expected_service_version(&self) -> bool;

    /// Install the service; returns whether it succeeded
    async fn install_service(&self) -> bool;

    /// Whether the service has the permissions it needs
    async fn has_expected_permissions(&self) -> bool;

    /// Forward a local port to the service and return it
    async fn setup_tcp_forwarding(&self) -> InsightsResult<u16>;

    /// Remove the forwarding on `port`
    async fn remove_tcp_forwarding(&self, port: u16) -> InsightsResult<()>;

    /// Ask the service on `port` for its configuration
    async fn fetch_device_config(&self, port: u16) -> InsightsResult<DeviceConfig>;
}

/// Store writes the setup steps perform
pub trait AndroidSetupStoreCallbacks: Send + Sync {
    /// Record the selected device
    fn set_selected_device(&self, device: Option<DeviceInfo>);

    /// Record the devices found by the last scan
    fn set_available_devices(&self, devices: Vec<DeviceInfo>);

    /// Record the application under test
    fn set_application_name(&self, name: Option<String>);

    /// The forwarded port, if one is set up
    fn get_scan_port(&self) -> Option<u16>;

    /// Record the forwarded port
    fn set_scan_port(&self, port: Option<u16>);
}

/// Dependency bag handed to every setup step config
#[derive(Clone)]
pub struct AndroidSetupStepDeps {
    /// Device access
    pub device: Arc<dyn AndroidSetupDeps>,
    /// Store writes
    pub store: Arc<dyn AndroidSetupStoreCallbacks>,
    /// Moves the workflow to another step
    pub transition: StepTransition<AndroidSetupStepId>,
}

impl fmt::Debug for AndroidSetupStepDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidSetupStepDeps")
            .field("transition", &self.transition)
            .finish_non_exhaustive()
    }
}
