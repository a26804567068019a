//! Scripted device for tests and dry runs.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::deps::{AndroidSetupDeps, DeviceConfig, DeviceInfo};
use crate::result::{InsightsError, InsightsResult};

/// How a [`ScriptedDevice`] answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptedDeviceConfig {
    /// Known adb location
    pub adb_path: Option<String>,
    /// Devices visible to adb
    pub devices: Vec<DeviceInfo>,
    /// Whether the expected service version is installed
    pub service_installed: bool,
    /// Whether installing the service succeeds
    pub install_succeeds: bool,
    /// Whether the service has its permissions
    pub permissions_granted: bool,
    /// Port handed out by forwarding; `None` makes forwarding fail
    pub forwarding_port: Option<u16>,
    /// App reported by the device; `None` makes the config fetch fail
    pub app_identifier: Option<String>,
    /// Whether removing an old forwarding fails
    pub remove_forwarding_fails: bool,
}

/// [`AndroidSetupDeps`] answering from a [`ScriptedDeviceConfig`] and
/// recording every call
#[derive(Debug, Default)]
pub struct ScriptedDevice {
    config: Mutex<ScriptedDeviceConfig>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDevice {
    /// Create a device answering from `config`
    #[must_use]
    pub fn new(config: ScriptedDeviceConfig) -> Self {
        Self {
            config: Mutex::new(config),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn config(&self) -> MutexGuard<'_, ScriptedDeviceConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }

    /// Change the script, e.g. to plug in a device before a rescan
    pub fn update(&self, change: impl FnOnce(&mut ScriptedDeviceConfig)) {
        change(&mut self.config());
    }

    /// A copy of the current script
    #[must_use]
    pub fn snapshot(&self) -> ScriptedDeviceConfig {
        self.config().clone()
    }

    /// Every call so far, in order
    #[must_use]
    pub fn call_history(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.call_history()
            .iter()
            .any(|call| call.starts_with(prefix))
    }
}

#[async_trait]
impl AndroidSetupDeps for ScriptedDevice {
    async fn has_adb_path(&self) -> bool {
        self.record("has_adb_path");
        self.config().adb_path.is_some()
    }

    fn set_adb_path(&self, path: &str) {
        self.record(format!("set_adb_path {path}"));
        self.config().adb_path = Some(path.to_string());
    }

    async fn get_devices(&self) -> InsightsResult<Vec<DeviceInfo>> {
        self.record("get_devices");
        let config = self.config();
        if config.adb_path.is_none() {
            return Err(InsightsError::device_setup("adb location unknown"));
        }
        Ok(config.devices.clone())
    }

    fn set_selected_device_id(&self, id: &str) {
        self.record(format!("set_selected_device_id {id}"));
    }

    async fn has_expected_service_version(&self) -> bool {
        self.record("has_expected_service_version");
        self.config().service_installed
    }

    async fn install_service(&self) -> bool {
        self.record("install_service");
        let mut config = self.config();
        if config.install_succeeds {
            config.service_installed = true;
        }
        config.install_succeeds
    }

    async fn has_expected_permissions(&self) -> bool {
        self.record("has_expected_permissions");
        self.config().permissions_granted
    }

    async fn setup_tcp_forwarding(&self) -> InsightsResult<u16> {
        self.record("setup_tcp_forwarding");
        self.config()
            .forwarding_port
            .ok_or_else(|| InsightsError::device_setup("port forwarding refused"))
    }

    async fn remove_tcp_forwarding(&self, port: u16) -> InsightsResult<()> {
        self.record(format!("remove_tcp_forwarding {port}"));
        if self.config().remove_forwarding_fails {
            return Err(InsightsError::device_setup("forwarding removal failed"));
        }
        Ok(())
    }

    async fn fetch_device_config(&self, port: u16) -> InsightsResult<DeviceConfig> {
        self.record(format!("fetch_device_config {port}"));
        self.config()
            .app_identifier
            .clone()
            .map(|app_identifier| DeviceConfig { app_identifier })
            .ok_or_else(|| InsightsError::device_setup("service did not answer"))
    }
}
