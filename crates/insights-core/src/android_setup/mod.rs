//! Android device setup workflow.
//!
//! A [`StateMachine`](crate::state_machine::StateMachine) that walks the user
//! from locating adb to a device ready for testing. Device access goes
//! through [`AndroidSetupDeps`]; adb itself lives outside this crate.
//! [`AndroidSetupStartListener`] kicks the workflow off without user input
//! once the adb setup flag is on.

mod actions;
mod deps;
mod scripted;
mod start_listener;
mod step_id;
mod steps;
mod store;

pub use actions::{AndroidSetupAction, AndroidSetupActionKind};
pub use deps::{
    AndroidSetupDeps, AndroidSetupStepDeps, AndroidSetupStoreCallbacks, DeviceConfig, DeviceInfo,
};
pub use scripted::{ScriptedDevice, ScriptedDeviceConfig};
pub use start_listener::AndroidSetupStartListener;
pub use step_id::AndroidSetupStepId;
pub use steps::{android_setup_step_configs, android_setup_steps_factory};
pub use store::{AndroidSetupStateMachine, AndroidSetupStore, AndroidSetupStoreData};
