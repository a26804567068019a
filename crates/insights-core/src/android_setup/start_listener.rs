//! Starts the setup workflow on its own once nothing holds it back.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, info};

use super::actions::AndroidSetupAction;
use super::step_id::AndroidSetupStepId;
use super::store::AndroidSetupStore;
use crate::settings::{FeatureFlag, FeatureFlagStoreData, UserConfigurationStoreData};
use crate::store::{ListenerId, StateStore};

#[derive(Debug, Clone, Copy)]
struct Registrations {
    setup: ListenerId,
    feature_flags: ListenerId,
    user_config: ListenerId,
}

struct Inner {
    user_config: StateStore<UserConfigurationStoreData>,
    setup: Weak<AndroidSetupStore>,
    feature_flags: StateStore<FeatureFlagStoreData>,
    registrations: Mutex<Option<Registrations>>,
    fired: AtomicBool,
}

impl Inner {
    fn ready(&self, setup: &AndroidSetupStore) -> bool {
        setup.get_state().current_step_id == AndroidSetupStepId::WaitToStart
            && self
                .feature_flags
                .get_state()
                .is_enabled(FeatureFlag::AdbSetupView)
            && !self.user_config.get_state().is_first_time
    }

    fn check(&self) {
        let Some(setup) = self.setup.upgrade() else {
            return;
        };
        if !self.ready(&setup) || self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        self.unregister(&setup);
        info!("android setup ready, sending ready-to-start");
        setup.invoke_action(AndroidSetupAction::ReadyToStart);
    }

    fn unregister(&self, setup: &AndroidSetupStore) {
        let registrations = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(registrations) = registrations {
            setup.remove_changed_listener(registrations.setup);
            self.feature_flags
                .remove_changed_listener(registrations.feature_flags);
            self.user_config
                .remove_changed_listener(registrations.user_config);
        }
    }
}

/// Sends [`AndroidSetupAction::ReadyToStart`] once, as soon as the workflow
/// waits at [`AndroidSetupStepId::WaitToStart`], the adb setup flag is on and
/// the user is past first-run.
///
/// Every change to the three stores re-checks the condition. After sending,
/// the listener unregisters from all of them. Dropping it unregisters too.
pub struct AndroidSetupStartListener {
    inner: Arc<Inner>,
}

impl fmt::Debug for AndroidSetupStartListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidSetupStartListener")
            .field("fired", &self.has_fired())
            .finish_non_exhaustive()
    }
}

impl AndroidSetupStartListener {
    /// Create a listener; nothing is registered until [`initialize`](Self::initialize)
    #[must_use]
    pub fn new(
        user_config: StateStore<UserConfigurationStoreData>,
        setup: &Arc<AndroidSetupStore>,
        feature_flags: StateStore<FeatureFlagStoreData>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                user_config,
                setup: Arc::downgrade(setup),
                feature_flags,
                registrations: Mutex::new(None),
                fired: AtomicBool::new(false),
            }),
        }
    }

    /// Listen to all three stores, then check the current state
    pub fn initialize(&self) {
        let Some(setup) = self.inner.setup.upgrade() else {
            debug!("android setup store gone, start listener not registered");
            return;
        };
        {
            let mut registrations = self
                .inner
                .registrations
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if registrations.is_some() || self.has_fired() {
                return;
            }
            let on_setup = Arc::downgrade(&self.inner);
            let on_flags = Arc::downgrade(&self.inner);
            let on_config = Arc::downgrade(&self.inner);
            *registrations = Some(Registrations {
                setup: setup.add_changed_listener(move |_| recheck(&on_setup)),
                feature_flags: self
                    .inner
                    .feature_flags
                    .add_changed_listener(move |_| recheck(&on_flags)),
                user_config: self
                    .inner
                    .user_config
                    .add_changed_listener(move |_| recheck(&on_config)),
            });
        }
        self.inner.check();
    }

    /// Whether ready-to-start has been sent
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }
}

impl Drop for AndroidSetupStartListener {
    fn drop(&mut self) {
        if let Some(setup) = self.inner.setup.upgrade() {
            self.inner.unregister(&setup);
        }
    }
}

fn recheck(inner: &Weak<Inner>) {
    if let Some(inner) = inner.upgrade() {
        inner.check();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::android_setup::scripted::{ScriptedDevice, ScriptedDeviceConfig};
    use crate::android_setup::AndroidSetupStoreData;

    struct Fixture {
        setup: Arc<AndroidSetupStore>,
        device: Arc<ScriptedDevice>,
        feature_flags: StateStore<FeatureFlagStoreData>,
        user_config: StateStore<UserConfigurationStoreData>,
        listener: AndroidSetupStartListener,
    }

    fn fixture(step: AndroidSetupStepId, adb_flag: bool, first_time: bool) -> Fixture {
        let device = Arc::new(ScriptedDevice::new(ScriptedDeviceConfig::default()));
        let setup = Arc::new(
            AndroidSetupStore::initialize(
                device.clone(),
                AndroidSetupStoreData {
                    current_step_id: step,
                    ..AndroidSetupStoreData::default()
                },
            )
            .unwrap(),
        );
        let feature_flags = StateStore::new(
            FeatureFlagStoreData::default().with(FeatureFlag::AdbSetupView, adb_flag),
        );
        let user_config = StateStore::new(UserConfigurationStoreData {
            is_first_time: first_time,
        });
        let listener =
            AndroidSetupStartListener::new(user_config.clone(), &setup, feature_flags.clone());
        Fixture {
            setup,
            device,
            feature_flags,
            user_config,
            listener,
        }
    }

    fn sent_ready_to_start(f: &Fixture) -> bool {
        f.device.call_history().iter().any(|call| call == "has_adb_path")
    }

    mod initial_state_tests {
        use super::*;

        fn case(step: AndroidSetupStepId, adb_flag: bool, first_time: bool, should_send: bool) {
            let f = fixture(step, adb_flag, first_time);
            let calls = f.device.call_history().len();
            f.listener.initialize();
            assert_eq!(
                f.listener.has_fired(),
                should_send,
                "step {step}, flag {adb_flag}, first time {first_time}"
            );
            assert_eq!(f.device.call_history().len() > calls, should_send);
        }

        #[tokio::test]
        async fn test_waiting_with_flag_after_first_run_sends() {
            case(AndroidSetupStepId::WaitToStart, true, false, true);
        }

        #[tokio::test]
        async fn test_first_run_holds_back() {
            case(AndroidSetupStepId::WaitToStart, true, true, false);
        }

        #[tokio::test]
        async fn test_flag_off_holds_back() {
            case(AndroidSetupStepId::WaitToStart, false, false, false);
            case(AndroidSetupStepId::WaitToStart, false, true, false);
        }

        #[tokio::test]
        async fn test_other_step_holds_back() {
            case(AndroidSetupStepId::DetectAdb, true, false, false);
        }
    }

    mod change_tests {
        use super::*;

        #[tokio::test]
        async fn test_sends_once_flag_turns_on() {
            let f = fixture(AndroidSetupStepId::WaitToStart, false, false);
            f.listener.initialize();
            assert!(!f.listener.has_fired());

            f.feature_flags
                .update(|flags| flags.set(FeatureFlag::AdbSetupView, true));
            f.setup.wait_for_idle().await;

            assert!(f.listener.has_fired());
            assert!(sent_ready_to_start(&f));
            assert_ne!(f.setup.get_state().current_step_id, AndroidSetupStepId::WaitToStart);
        }

        #[tokio::test]
        async fn test_sends_once_first_run_done() {
            let f = fixture(AndroidSetupStepId::WaitToStart, true, true);
            f.listener.initialize();
            f.user_config.update(|config| config.is_first_time = false);
            assert!(f.listener.has_fired());
        }

        #[tokio::test]
        async fn test_listeners_removed_after_sending() {
            let f = fixture(AndroidSetupStepId::WaitToStart, true, false);
            f.listener.initialize();
            assert!(f.listener.has_fired());
            assert_eq!(f.feature_flags.listener_count(), 0);
            assert_eq!(f.user_config.listener_count(), 0);

            let calls = f.device.call_history().len();
            f.feature_flags
                .update(|flags| flags.set(FeatureFlag::AdbSetupView, true));
            assert_eq!(f.device.call_history().len(), calls);
        }

        #[tokio::test]
        async fn test_waiting_listener_stays_registered() {
            let f = fixture(AndroidSetupStepId::WaitToStart, false, false);
            f.listener.initialize();
            f.user_config.update(|config| config.is_first_time = false);
            assert!(!f.listener.has_fired());
            assert_eq!(f.feature_flags.listener_count(), 1);
            assert_eq!(f.user_config.listener_count(), 1);
        }

        #[tokio::test]
        async fn test_drop_unregisters() {
            let f = fixture(AndroidSetupStepId::WaitToStart, false, false);
            f.listener.initialize();
            let Fixture {
                feature_flags,
                user_config,
                listener,
                ..
            } = f;
            drop(listener);
            assert_eq!(feature_flags.listener_count(), 0);
            assert_eq!(user_config.listener_count(), 0);
        }
    }
}
