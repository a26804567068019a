//! One config function per setup step.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use super::actions::{AndroidSetupAction, AndroidSetupActionKind};
use super::deps::{AndroidSetupDeps, AndroidSetupStepDeps, AndroidSetupStoreCallbacks, DeviceConfig};
use super::step_id::AndroidSetupStepId;
use crate::result::InsightsResult;
use crate::state_machine::{
    compose_steps_factory, Step, StepConfig, StepConfigs, StepTable, StepTransition,
};

use AndroidSetupActionKind as Kind;
use AndroidSetupStepId as Id;

type SetupStep = Step<AndroidSetupAction>;

fn move_to(deps: &AndroidSetupStepDeps, step: Id) -> impl Fn(AndroidSetupAction) + Send + Sync + 'static {
    let transition = deps.transition.clone();
    move |_| {
        transition.to(step);
    }
}

/// Entry effect that asks the device a yes/no question and branches on it
fn branch_on<F>(deps: &AndroidSetupStepDeps, check: F, pass: Id, fail: Id) -> SetupStep
where
    F: for<'a> Fn(&'a dyn AndroidSetupDeps) -> BoxFuture<'a, bool> + Send + Sync + 'static,
{
    let device = Arc::clone(&deps.device);
    let transition = deps.transition.clone();
    let check = Arc::new(check);
    Step::new().on_enter(move || {
        let device = Arc::clone(&device);
        let transition = transition.clone();
        let check = Arc::clone(&check);
        async move {
            let passed = check(device.as_ref()).await;
            debug!(%pass, %fail, passed, "setup check finished");
            transition.to(if passed { pass } else { fail });
            Ok(())
        }
    })
}

pub fn wait_to_start(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new().on_action(Kind::ReadyToStart, move_to(deps, Id::DetectAdb))
}

pub fn detect_adb(deps: &AndroidSetupStepDeps) -> SetupStep {
    branch_on(
        deps,
        |device| device.has_adb_path(),
        Id::DetectDevices,
        Id::PromptLocateAdb,
    )
}

pub fn prompt_locate_adb(deps: &AndroidSetupStepDeps) -> SetupStep {
    let device = Arc::clone(&deps.device);
    let transition = deps.transition.clone();
    Step::new().on_action(Kind::SaveAdbPath, move |action| {
        if let AndroidSetupAction::SaveAdbPath(path) = action {
            device.set_adb_path(&path);
            transition.to(Id::DetectAdb);
        }
    })
}

/// Lists devices. None leads to the connect prompt; a single device is
/// preselected before the choose prompt.
pub fn detect_devices(deps: &AndroidSetupStepDeps) -> SetupStep {
    let deps = deps.clone();
    Step::new().on_enter(move || {
        let deps = deps.clone();
        async move {
            let devices = match deps.device.get_devices().await {
                Ok(devices) => devices,
                Err(err) => {
                    warn!(error = %err, "device scan failed");
                    Vec::new()
                }
            };
            info!(count = devices.len(), "devices detected");
            deps.store.set_available_devices(devices.clone());
            match devices.as_slice() {
                [] => {
                    deps.transition.to(Id::PromptConnectToDevice);
                }
                [only] => {
                    deps.device.set_selected_device_id(&only.id);
                    deps.store.set_selected_device(Some(only.clone()));
                    deps.transition.to(Id::PromptChooseDevice);
                }
                _ => {
                    deps.transition.to(Id::PromptChooseDevice);
                }
            }
            Ok(())
        }
    })
}

pub fn prompt_connect_to_device(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new()
        .on_action(Kind::Rescan, move_to(deps, Id::DetectDevices))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptLocateAdb))
}

pub fn prompt_choose_device(deps: &AndroidSetupStepDeps) -> SetupStep {
    let device = Arc::clone(&deps.device);
    let store = Arc::clone(&deps.store);
    let transition = deps.transition.clone();
    Step::new()
        .on_action(Kind::SetSelectedDevice, move |action| {
            if let AndroidSetupAction::SetSelectedDevice(selected) = action {
                device.set_selected_device_id(&selected.id);
                store.set_selected_device(Some(selected));
                transition.to(Id::DetectService);
            }
        })
        .on_action(Kind::Rescan, move_to(deps, Id::DetectDevices))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptLocateAdb))
}

pub fn detect_service(deps: &AndroidSetupStepDeps) -> SetupStep {
    branch_on(
        deps,
        |device| device.has_expected_service_version(),
        Id::DetectPermissions,
        Id::PromptInstallService,
    )
}

pub fn prompt_install_service(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new()
        .on_action(Kind::Next, move_to(deps, Id::InstallingService))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptChooseDevice))
}

pub fn installing_service(deps: &AndroidSetupStepDeps) -> SetupStep {
    branch_on(
        deps,
        |device| device.install_service(),
        Id::DetectPermissions,
        Id::PromptInstallFailed,
    )
}

pub fn prompt_install_failed(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new()
        .on_action(Kind::Next, move_to(deps, Id::InstallingService))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptChooseDevice))
}

pub fn detect_permissions(deps: &AndroidSetupStepDeps) -> SetupStep {
    branch_on(
        deps,
        |device| device.has_expected_permissions(),
        Id::ConfiguringPortForwarding,
        Id::PromptGrantPermissions,
    )
}

pub fn prompt_grant_permissions(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new()
        .on_action(Kind::Next, move_to(deps, Id::DetectPermissions))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptChooseDevice))
}

async fn forward_and_fetch(device: &dyn AndroidSetupDeps) -> InsightsResult<(u16, DeviceConfig)> {
    let port = device.setup_tcp_forwarding().await?;
    let config = device.fetch_device_config(port).await?;
    Ok((port, config))
}

/// Replaces any previous forwarding, then reads the device config through
/// the new one. On failure both the port and the application name are
/// cleared.
pub fn configuring_port_forwarding(deps: &AndroidSetupStepDeps) -> SetupStep {
    let deps = deps.clone();
    Step::new().on_enter(move || {
        let deps = deps.clone();
        async move {
            if let Some(previous) = deps.store.get_scan_port() {
                if let Err(err) = deps.device.remove_tcp_forwarding(previous).await {
                    debug!(port = previous, error = %err, "ignoring failure to remove old forwarding");
                }
            }

            match forward_and_fetch(deps.device.as_ref()).await {
                Ok((port, config)) => {
                    info!(port, app = %config.app_identifier, "port forwarding configured");
                    deps.store.set_scan_port(Some(port));
                    deps.store.set_application_name(Some(config.app_identifier));
                    deps.transition.to(Id::PromptConnectedStartTesting);
                }
                Err(err) => {
                    warn!(error = %err, "port forwarding failed");
                    deps.store.set_scan_port(None);
                    deps.store.set_application_name(None);
                    deps.transition.to(Id::PromptConfiguringPortForwardingFailed);
                }
            }
            Ok(())
        }
    })
}

pub fn prompt_configuring_port_forwarding_failed(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new()
        .on_action(Kind::Next, move_to(deps, Id::ConfiguringPortForwarding))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptChooseDevice))
}

pub fn prompt_connected_start_testing(deps: &AndroidSetupStepDeps) -> SetupStep {
    Step::new()
        .on_action(Kind::Rescan, move_to(deps, Id::DetectDevices))
        .on_action(Kind::Cancel, move_to(deps, Id::PromptChooseDevice))
}

/// Config function for every setup step
#[must_use]
pub fn android_setup_step_configs() -> StepConfigs<Id, AndroidSetupStepDeps, AndroidSetupAction> {
    let configs: [(Id, StepConfig<AndroidSetupStepDeps, AndroidSetupAction>); 15] = [
        (Id::WaitToStart, wait_to_start),
        (Id::DetectAdb, detect_adb),
        (Id::PromptLocateAdb, prompt_locate_adb),
        (Id::DetectDevices, detect_devices),
        (Id::PromptConnectToDevice, prompt_connect_to_device),
        (Id::PromptChooseDevice, prompt_choose_device),
        (Id::DetectService, detect_service),
        (Id::PromptInstallService, prompt_install_service),
        (Id::InstallingService, installing_service),
        (Id::PromptInstallFailed, prompt_install_failed),
        (Id::DetectPermissions, detect_permissions),
        (Id::PromptGrantPermissions, prompt_grant_permissions),
        (Id::ConfiguringPortForwarding, configuring_port_forwarding),
        (
            Id::PromptConfiguringPortForwardingFailed,
            prompt_configuring_port_forwarding_failed,
        ),
        (Id::PromptConnectedStartTesting, prompt_connected_start_testing),
    ];
    configs
        .into_iter()
        .map(|(id, config)| (id, Some(config)))
        .collect::<HashMap<_, _>>()
}

/// Steps factory for the setup machine
pub fn android_setup_steps_factory(
    device: Arc<dyn AndroidSetupDeps>,
    store: Arc<dyn AndroidSetupStoreCallbacks>,
) -> impl FnOnce(StepTransition<Id>) -> Option<StepTable<Id, AndroidSetupAction>> {
    compose_steps_factory(
        (device, store),
        android_setup_step_configs(),
        |(device, store), transition| AndroidSetupStepDeps {
            device,
            store,
            transition,
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::android_setup::deps::DeviceInfo;
    use crate::android_setup::scripted::{ScriptedDevice, ScriptedDeviceConfig};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeStore {
        selected: Mutex<Option<DeviceInfo>>,
        available: Mutex<Vec<DeviceInfo>>,
        app_name: Mutex<Option<String>>,
        scan_port: Mutex<Option<u16>>,
    }

    impl AndroidSetupStoreCallbacks for FakeStore {
        fn set_selected_device(&self, device: Option<DeviceInfo>) {
            *self.selected.lock().unwrap() = device;
        }

        fn set_available_devices(&self, devices: Vec<DeviceInfo>) {
            *self.available.lock().unwrap() = devices;
        }

        fn set_application_name(&self, name: Option<String>) {
            *self.app_name.lock().unwrap() = name;
        }

        fn get_scan_port(&self) -> Option<u16> {
            *self.scan_port.lock().unwrap()
        }

        fn set_scan_port(&self, port: Option<u16>) {
            *self.scan_port.lock().unwrap() = port;
        }
    }

    struct Fixture {
        device: Arc<ScriptedDevice>,
        store: Arc<FakeStore>,
        transitions: Arc<Mutex<Vec<Id>>>,
        deps: AndroidSetupStepDeps,
    }

    fn fixture(config: ScriptedDeviceConfig) -> Fixture {
        let device = Arc::new(ScriptedDevice::new(config));
        let store = Arc::new(FakeStore::default());
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let sink = transitions.clone();
        let deps = AndroidSetupStepDeps {
            device: device.clone(),
            store: store.clone(),
            transition: StepTransition::detached(move |step| sink.lock().unwrap().push(step)),
        };
        Fixture {
            device,
            store,
            transitions,
            deps,
        }
    }

    fn device(id: &str) -> DeviceInfo {
        DeviceInfo {
            id: id.into(),
            friendly_name: format!("Phone {id}"),
            is_emulator: false,
        }
    }

    fn kinds(step: &SetupStep) -> Vec<Kind> {
        let mut kinds: Vec<_> = step.action_kinds().collect();
        kinds.sort_by_key(|kind| format!("{kind:?}"));
        kinds
    }

    mod configuring_port_forwarding_tests {
        use super::*;

        fn working() -> ScriptedDeviceConfig {
            ScriptedDeviceConfig {
                forwarding_port: Some(2),
                app_identifier: Some("new app".into()),
                ..ScriptedDeviceConfig::default()
            }
        }

        #[test]
        fn test_has_entry_and_no_actions() {
            let f = fixture(working());
            let step = configuring_port_forwarding(&f.deps);
            assert!(step.has_on_enter());
            assert!(kinds(&step).is_empty());
        }

        #[tokio::test]
        async fn test_success_without_previous_state() {
            let f = fixture(working());
            configuring_port_forwarding(&f.deps).enter().unwrap().await.unwrap();

            assert_eq!(*f.store.scan_port.lock().unwrap(), Some(2));
            assert_eq!(f.store.app_name.lock().unwrap().as_deref(), Some("new app"));
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::PromptConnectedStartTesting]);
            assert!(!f.device.was_called("remove_tcp_forwarding"));
            assert!(f.device.was_called("fetch_device_config 2"));
        }

        #[tokio::test]
        async fn test_success_replaces_previous_forwarding() {
            let f = fixture(working());
            *f.store.scan_port.lock().unwrap() = Some(1);
            *f.store.app_name.lock().unwrap() = Some("old app".into());

            configuring_port_forwarding(&f.deps).enter().unwrap().await.unwrap();

            assert!(f.device.was_called("remove_tcp_forwarding 1"));
            assert_eq!(*f.store.scan_port.lock().unwrap(), Some(2));
            assert_eq!(f.store.app_name.lock().unwrap().as_deref(), Some("new app"));
        }

        #[tokio::test]
        async fn test_ignores_removal_errors() {
            let f = fixture(ScriptedDeviceConfig {
                remove_forwarding_fails: true,
                ..working()
            });
            *f.store.scan_port.lock().unwrap() = Some(1);

            configuring_port_forwarding(&f.deps).enter().unwrap().await.unwrap();

            assert_eq!(*f.store.scan_port.lock().unwrap(), Some(2));
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::PromptConnectedStartTesting]);
        }

        #[tokio::test]
        async fn test_forwarding_failure_clears_state() {
            for previous in [None, Some(1)] {
                let f = fixture(ScriptedDeviceConfig {
                    forwarding_port: None,
                    ..working()
                });
                *f.store.scan_port.lock().unwrap() = previous;
                *f.store.app_name.lock().unwrap() = previous.map(|_| "old app".to_string());

                configuring_port_forwarding(&f.deps).enter().unwrap().await.unwrap();

                assert_eq!(*f.store.scan_port.lock().unwrap(), None);
                assert_eq!(*f.store.app_name.lock().unwrap(), None);
                assert_eq!(
                    f.transitions.lock().unwrap().as_slice(),
                    &[Id::PromptConfiguringPortForwardingFailed]
                );
                assert!(!f.device.was_called("fetch_device_config"));
            }
        }

        #[tokio::test]
        async fn test_config_fetch_failure_clears_state() {
            let f = fixture(ScriptedDeviceConfig {
                app_identifier: None,
                ..working()
            });
            *f.store.scan_port.lock().unwrap() = Some(1);

            configuring_port_forwarding(&f.deps).enter().unwrap().await.unwrap();

            assert_eq!(*f.store.scan_port.lock().unwrap(), None);
            assert_eq!(*f.store.app_name.lock().unwrap(), None);
            assert_eq!(
                f.transitions.lock().unwrap().as_slice(),
                &[Id::PromptConfiguringPortForwardingFailed]
            );
        }
    }

    mod detect_devices_tests {
        use super::*;

        fn with_devices(devices: Vec<DeviceInfo>) -> Fixture {
            fixture(ScriptedDeviceConfig {
                adb_path: Some("/opt/adb".into()),
                devices,
                ..ScriptedDeviceConfig::default()
            })
        }

        #[tokio::test]
        async fn test_no_devices() {
            let f = with_devices(Vec::new());
            detect_devices(&f.deps).enter().unwrap().await.unwrap();
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::PromptConnectToDevice]);
        }

        #[tokio::test]
        async fn test_single_device_preselected() {
            let f = with_devices(vec![device("a")]);
            detect_devices(&f.deps).enter().unwrap().await.unwrap();
            assert_eq!(*f.store.selected.lock().unwrap(), Some(device("a")));
            assert!(f.device.was_called("set_selected_device_id a"));
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::PromptChooseDevice]);
        }

        #[tokio::test]
        async fn test_many_devices() {
            let f = with_devices(vec![device("a"), device("b")]);
            detect_devices(&f.deps).enter().unwrap().await.unwrap();
            assert_eq!(f.store.available.lock().unwrap().len(), 2);
            assert_eq!(*f.store.selected.lock().unwrap(), None);
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::PromptChooseDevice]);
        }

        #[tokio::test]
        async fn test_scan_failure_treated_as_no_devices() {
            let f = fixture(ScriptedDeviceConfig::default());
            detect_devices(&f.deps).enter().unwrap().await.unwrap();
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::PromptConnectToDevice]);
        }
    }

    mod branching_tests {
        use super::*;

        #[tokio::test]
        async fn test_detect_adb_branches() {
            let f = fixture(ScriptedDeviceConfig::default());
            detect_adb(&f.deps).enter().unwrap().await.unwrap();
            f.device.set_adb_path("/opt/adb");
            detect_adb(&f.deps).enter().unwrap().await.unwrap();
            assert_eq!(
                f.transitions.lock().unwrap().as_slice(),
                &[Id::PromptLocateAdb, Id::DetectDevices]
            );
        }

        #[tokio::test]
        async fn test_installing_service_branches() {
            let f = fixture(ScriptedDeviceConfig::default());
            installing_service(&f.deps).enter().unwrap().await.unwrap();
            f.device.update(|config| config.install_succeeds = true);
            installing_service(&f.deps).enter().unwrap().await.unwrap();
            assert_eq!(
                f.transitions.lock().unwrap().as_slice(),
                &[Id::PromptInstallFailed, Id::DetectPermissions]
            );
        }
    }

    mod action_tests {
        use super::*;

        #[test]
        fn test_expected_actions_defined() {
            let f = fixture(ScriptedDeviceConfig::default());
            let expected: [(StepConfig<AndroidSetupStepDeps, AndroidSetupAction>, Vec<Kind>); 6] = [
                (wait_to_start, vec![Kind::ReadyToStart]),
                (prompt_locate_adb, vec![Kind::SaveAdbPath]),
                (prompt_connect_to_device, vec![Kind::Cancel, Kind::Rescan]),
                (prompt_choose_device, vec![Kind::Cancel, Kind::Rescan, Kind::SetSelectedDevice]),
                (prompt_install_failed, vec![Kind::Cancel, Kind::Next]),
                (prompt_connected_start_testing, vec![Kind::Cancel, Kind::Rescan]),
            ];
            for (config, kinds_expected) in expected {
                assert_eq!(kinds(&config(&f.deps)), kinds_expected);
            }
        }

        #[test]
        fn test_save_adb_path_then_detect() {
            let f = fixture(ScriptedDeviceConfig::default());
            let step = prompt_locate_adb(&f.deps);
            step.dispatch(AndroidSetupAction::SaveAdbPath("/opt/adb".into()));
            assert_eq!(f.device.snapshot().adb_path.as_deref(), Some("/opt/adb"));
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::DetectAdb]);
        }

        #[test]
        fn test_choose_device_records_selection() {
            let f = fixture(ScriptedDeviceConfig::default());
            let step = prompt_choose_device(&f.deps);
            step.dispatch(AndroidSetupAction::SetSelectedDevice(device("b")));
            assert_eq!(*f.store.selected.lock().unwrap(), Some(device("b")));
            assert!(f.device.was_called("set_selected_device_id b"));
            assert_eq!(f.transitions.lock().unwrap().as_slice(), &[Id::DetectService]);
        }

        #[test]
        fn test_every_step_configured() {
            let configs = android_setup_step_configs();
            for id in Id::ALL {
                assert!(configs[&id].is_some(), "{id} has no config");
            }
        }
    }
}
