//! YAML scenario files.
//!
//! A frame scenario describes a page: the results the top window reports and
//! a tree of iframes, each with its own results. A setup scenario describes a
//! scripted device and the actions a user takes.

use std::fs;
use std::path::Path;

use insights_core::android_setup::{AndroidSetupAction, AndroidSetupStepId, ScriptedDeviceConfig};
use insights_core::tab_stops::{AutomatedTabStopRequirementResult, TabStopRequirementId};
use insights_core::{FeatureFlagStoreData, SimulatedBrowser, WindowId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

fn read_yaml<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = fs::read_to_string(path)?;
    serde_yaml_ng::from_str(&text).map_err(|e| CliError::scenario(path, e.to_string()))
}

const fn yes() -> bool {
    true
}

/// A result as written in a scenario: one selector inside its own frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioResult {
    /// Requirement that was violated
    pub requirement: TabStopRequirementId,
    /// What is wrong
    #[serde(default)]
    pub description: String,
    /// Element selector inside the reporting frame
    pub selector: String,
    /// Element markup
    #[serde(default)]
    pub html: String,
}

impl From<&ScenarioResult> for AutomatedTabStopRequirementResult {
    fn from(result: &ScenarioResult) -> Self {
        Self::new(
            result.requirement,
            result.description.clone(),
            result.selector.clone(),
            result.html.clone(),
        )
    }
}

/// An `<iframe>` and everything inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameSpec {
    /// Selector of the iframe element in its parent document
    pub selector: String,
    /// Raw `sandbox` attribute
    #[serde(default)]
    pub sandbox: Option<String>,
    /// Whether the frame's window answers messages
    #[serde(default = "yes")]
    pub responsive: bool,
    /// A frame element without a content window
    #[serde(default)]
    pub detached: bool,
    /// Results this frame reports
    #[serde(default)]
    pub results: Vec<ScenarioResult>,
    /// Nested iframes
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
}

/// A page to collect tab-stop results from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameScenario {
    /// Results reported by the top window itself
    #[serde(default)]
    pub results: Vec<ScenarioResult>,
    /// Iframes in the top document
    #[serde(default)]
    pub frames: Vec<FrameSpec>,
    /// Whether automated tab-stop collection is switched on
    #[serde(default = "yes")]
    pub tab_stops_automation: bool,
    /// Whether the scan still wants automated results
    #[serde(default = "yes")]
    pub need_to_collect: bool,
    /// Whether the user finishes tabbing before collection stops
    #[serde(default = "yes")]
    pub tabbing_completed: bool,
}

/// The simulated page a [`FrameScenario`] describes
#[derive(Debug)]
pub struct LoadedPage {
    /// The page
    pub browser: SimulatedBrowser,
    /// Results each window reports, in window creation order
    pub reports: Vec<(WindowId, Vec<AutomatedTabStopRequirementResult>)>,
}

impl FrameScenario {
    /// Read a scenario file
    pub fn from_path(path: &Path) -> CliResult<Self> {
        let scenario: Self = read_yaml(path)?;
        scenario
            .validate()
            .map_err(|message| CliError::scenario(path, message))?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), String> {
        fn check(frames: &[FrameSpec]) -> Result<(), String> {
            for frame in frames {
                if frame.selector.is_empty() {
                    return Err("frame selector is empty".to_string());
                }
                if frame.detached && !(frame.results.is_empty() && frame.frames.is_empty()) {
                    return Err(format!(
                        "detached frame {} cannot contain results or frames",
                        frame.selector
                    ));
                }
                check(&frame.frames)?;
            }
            Ok(())
        }
        check(&self.frames)
    }

    /// Build the simulated page
    pub fn load(&self) -> CliResult<LoadedPage> {
        let browser = SimulatedBrowser::new();
        let mut reports: Vec<(WindowId, Vec<AutomatedTabStopRequirementResult>)> =
            vec![(browser.top(), self.results.iter().map(Into::into).collect())];
        add_frames(&browser, browser.top(), &self.frames, &mut reports)?;
        Ok(LoadedPage { browser, reports })
    }
}

fn add_frames(
    browser: &SimulatedBrowser,
    parent: WindowId,
    frames: &[FrameSpec],
    reports: &mut Vec<(WindowId, Vec<AutomatedTabStopRequirementResult>)>,
) -> CliResult<()> {
    for frame in frames {
        if frame.detached {
            browser.add_detached_frame(parent, frame.selector.as_str())?;
            continue;
        }
        let window = match &frame.sandbox {
            Some(sandbox) => browser.add_sandboxed_frame(parent, frame.selector.as_str(), sandbox.as_str())?,
            None => browser.add_frame(parent, frame.selector.as_str())?,
        };
        if !frame.responsive {
            browser.set_unresponsive(window, true)?;
        }
        reports.push((window, frame.results.iter().map(Into::into).collect()));
        add_frames(browser, window, &frame.frames, reports)?;
    }
    Ok(())
}

/// A scripted device and the actions taken against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupScenario {
    /// How the device answers
    #[serde(default)]
    pub device: ScriptedDeviceConfig,
    /// Step to resume from
    #[serde(default)]
    pub start_at: Option<AndroidSetupStepId>,
    /// Feature flags; with `adbSetupView` on, a user past first run starts
    /// without sending ready-to-start
    #[serde(default)]
    pub feature_flags: FeatureFlagStoreData,
    /// Whether the user is still on first run
    #[serde(default)]
    pub first_time: bool,
    /// User actions, applied in order once the previous one settled
    #[serde(default)]
    pub actions: Vec<AndroidSetupAction>,
    /// Step the workflow must end on
    #[serde(default)]
    pub expect: Option<AndroidSetupStepId>,
}

impl SetupScenario {
    /// Read a scenario file
    pub fn from_path(path: &Path) -> CliResult<Self> {
        read_yaml(path)
    }
}
