//! Setup command handler: the Android setup workflow against a scripted device

use std::sync::{Arc, Mutex, PoisonError};

use insights_core::android_setup::{
    AndroidSetupAction, AndroidSetupStartListener, AndroidSetupStepId, AndroidSetupStore,
    AndroidSetupStoreData, ScriptedDevice,
};
use insights_core::{StateStore, UserConfigurationStoreData};
use serde::Serialize;
use tracing::info;

use super::runtime;
use crate::commands::SetupArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::scenario::SetupScenario;

/// One applied action
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    /// The action sent
    pub action: AndroidSetupAction,
    /// Whether the step it was sent to handled it
    pub handled: bool,
    /// Step once every effect it started had finished
    pub step: AndroidSetupStepId,
}

/// What a setup run produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupReport {
    /// Every step entered, in order
    pub steps: Vec<AndroidSetupStepId>,
    /// Actions in the order they were applied
    pub actions: Vec<ActionOutcome>,
    /// Store contents once the last action settled
    pub final_state: AndroidSetupStoreData,
    /// Calls made to the device
    pub device_calls: Vec<String>,
    /// Whether the workflow started without a ready-to-start action
    pub auto_started: bool,
}

/// Let the start listener kick off the workflow, then run the scenario's
/// actions one at a time, waiting for each to settle
pub async fn walk(scenario: &SetupScenario) -> CliResult<SetupReport> {
    let device = Arc::new(ScriptedDevice::new(scenario.device.clone()));
    let initial = AndroidSetupStoreData {
        current_step_id: scenario.start_at.unwrap_or(AndroidSetupStepId::WaitToStart),
        ..AndroidSetupStoreData::default()
    };

    let steps = Arc::new(Mutex::new(vec![initial.current_step_id]));
    let store = Arc::new(AndroidSetupStore::initialize(device.clone(), initial)?);
    let sink = Arc::clone(&steps);
    store.add_changed_listener(move |data| {
        let mut steps = sink.lock().unwrap_or_else(PoisonError::into_inner);
        if steps.last() != Some(&data.current_step_id) {
            steps.push(data.current_step_id);
        }
    });
    let start_listener = AndroidSetupStartListener::new(
        StateStore::new(UserConfigurationStoreData {
            is_first_time: scenario.first_time,
        }),
        &store,
        StateStore::new(scenario.feature_flags.clone()),
    );
    start_listener.initialize();
    store.wait_for_idle().await;

    let mut actions = Vec::with_capacity(scenario.actions.len());
    for action in &scenario.actions {
        let handled = store.invoke_action(action.clone());
        store.wait_for_idle().await;
        let step = store.get_state().current_step_id;
        info!(?action, handled, %step, "action applied");
        actions.push(ActionOutcome {
            action: action.clone(),
            handled,
            step,
        });
    }

    let steps = steps.lock().unwrap_or_else(PoisonError::into_inner).clone();
    Ok(SetupReport {
        steps,
        actions,
        final_state: store.get_state(),
        device_calls: device.call_history(),
        auto_started: start_listener.has_fired(),
    })
}

/// Execute the setup command
pub fn execute_setup(config: &CliConfig, args: &SetupArgs) -> CliResult<()> {
    let scenario = SetupScenario::from_path(&args.scenario)?;
    let report = runtime()?.block_on(walk(&scenario))?;

    let reporter = Reporter::from_config(config, args.format);
    if reporter.is_json() {
        reporter.json(&report)?;
    } else {
        print_report(&reporter, &report);
    }

    match scenario.expect {
        Some(expected) if expected != report.final_state.current_step_id => {
            Err(CliError::run(format!(
                "setup ended on {}, expected {expected}",
                report.final_state.current_step_id
            )))
        }
        _ => Ok(()),
    }
}

fn print_report(reporter: &Reporter, report: &SetupReport) {
    reporter.header("Android setup");
    if report.auto_started {
        reporter.info("Started automatically");
    }
    for step in &report.steps {
        reporter.item(step.as_str());
    }
    for outcome in report.actions.iter().filter(|outcome| !outcome.handled) {
        reporter.info(&format!("{:?} ignored in {}", outcome.action, outcome.step));
    }

    let state = &report.final_state;
    if state.current_step_id == AndroidSetupStepId::PromptConnectedStartTesting {
        let app = state.application_name.as_deref().unwrap_or("unknown app");
        let port = state
            .scan_port
            .map_or_else(|| "no port".to_string(), |port| port.to_string());
        reporter.success(&format!("Connected to {app} on port {port}"));
    } else {
        reporter.info(&format!("Waiting at {}", state.current_step_id));
    }
}
