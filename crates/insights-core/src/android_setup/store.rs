//! Store that owns the setup machine and mirrors its progress.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::actions::AndroidSetupAction;
use super::deps::{AndroidSetupDeps, AndroidSetupStoreCallbacks, DeviceInfo};
use super::step_id::AndroidSetupStepId;
use super::steps::android_setup_steps_factory;
use crate::result::InsightsResult;
use crate::state_machine::StateMachine;
use crate::store::{ListenerId, StateStore};

/// The setup state machine
pub type AndroidSetupStateMachine = StateMachine<AndroidSetupStepId, AndroidSetupAction>;

/// Everything the setup UI renders from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidSetupStoreData {
    /// Active step
    pub current_step_id: AndroidSetupStepId,
    /// Device the scan will run against
    pub selected_device: Option<DeviceInfo>,
    /// Devices found by the last detection
    pub available_devices: Vec<DeviceInfo>,
    /// App running on the connected device
    pub application_name: Option<String>,
    /// Local port forwarded to the device service
    pub scan_port: Option<u16>,
}

impl Default for AndroidSetupStoreData {
    fn default() -> Self {
        Self {
            current_step_id: AndroidSetupStepId::WaitToStart,
            selected_device: None,
            available_devices: Vec::new(),
            application_name: None,
            scan_port: None,
        }
    }
}

impl AndroidSetupStoreCallbacks for StateStore<AndroidSetupStoreData> {
    fn set_selected_device(&self, device: Option<DeviceInfo>) {
        self.update(|data| data.selected_device = device);
    }

    fn set_available_devices(&self, devices: Vec<DeviceInfo>) {
        self.update(|data| data.available_devices = devices);
    }

    fn set_application_name(&self, name: Option<String>) {
        self.update(|data| data.application_name = name);
    }

    fn get_scan_port(&self) -> Option<u16> {
        self.get_state().scan_port
    }

    fn set_scan_port(&self, port: Option<u16>) {
        self.update(|data| data.scan_port = port);
    }
}

/// Owns the setup machine; every step change and step write lands in the
/// store's state and is announced to change listeners
pub struct AndroidSetupStore {
    state: StateStore<AndroidSetupStoreData>,
    machine: AndroidSetupStateMachine,
}

impl fmt::Debug for AndroidSetupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidSetupStore")
            .field("state", &self.state.get_state())
            .field("machine", &self.machine)
            .finish()
    }
}

impl AndroidSetupStore {
    /// Build the machine and enter `initial.current_step_id`
    pub fn initialize(
        device: Arc<dyn AndroidSetupDeps>,
        initial: AndroidSetupStoreData,
    ) -> InsightsResult<Self> {
        let first_step = initial.current_step_id;
        let state = StateStore::new(initial);
        let callbacks: Arc<dyn AndroidSetupStoreCallbacks> = Arc::new(state.clone());
        let on_step = state.clone();
        let machine = StateMachine::new(
            android_setup_steps_factory(device, callbacks),
            move |step| on_step.update(|data| data.current_step_id = step),
            first_step,
        )?;
        Ok(Self { state, machine })
    }

    /// Forward `action` to the machine; returns whether the current step handled it
    pub fn invoke_action(&self, action: AndroidSetupAction) -> bool {
        self.machine.invoke_action(action)
    }

    /// A copy of the current state
    #[must_use]
    pub fn get_state(&self) -> AndroidSetupStoreData {
        self.state.get_state()
    }

    /// Register a listener called after every change
    pub fn add_changed_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&AndroidSetupStoreData) + Send + Sync + 'static,
    {
        self.state.add_changed_listener(listener)
    }

    /// Remove a change listener
    pub fn remove_changed_listener(&self, id: ListenerId) -> bool {
        self.state.remove_changed_listener(id)
    }

    /// Watch the current step
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AndroidSetupStepId>> {
        self.machine.subscribe()
    }

    /// Wait until no step entry effect is running
    pub async fn wait_for_idle(&self) {
        self.machine.wait_for_idle().await;
    }

    /// The underlying machine
    #[must_use]
    pub const fn machine(&self) -> &AndroidSetupStateMachine {
        &self.machine
    }
}
