//! Frames command handler: tab-stop collection across a simulated page

use std::sync::{Arc, Mutex, PoisonError};

use insights_core::tab_stops::{
    AutomatedTabStopRequirementResult, TabStopRequirementActionMessageCreator,
    TabStopsRequirementResultProcessor, TabStopsRequirementTarget, TabStopsScanResultData,
    VisualizationScanResultData,
};
use insights_core::{AllFrameRunner, FeatureFlag, FeatureFlagStoreData, InsightsConfig, StateStore};
use serde::Serialize;
use tracing::{debug, info};

use super::config::load_insights_config;
use super::runtime;
use crate::commands::FramesArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use crate::scenario::{FrameScenario, LoadedPage};

type Results = Vec<AutomatedTabStopRequirementResult>;

/// What a frames run produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FramesReport {
    /// Windows on the page, the top window included
    pub windows: usize,
    /// Windows whose target was started
    pub collecting_windows: usize,
    /// Unique results in arrival order
    pub results: Results,
    /// Results sent when tabbing completed, if that happened
    pub completed: Option<Results>,
}

/// Stands in for the scan result store's action handlers: records what the
/// processor sends and writes the collection flag back to the store
struct ScanStoreMessages {
    store: StateStore<VisualizationScanResultData>,
    completed: Mutex<Option<Results>>,
}

impl TabStopRequirementActionMessageCreator for ScanStoreMessages {
    fn add_tab_stop_instance(&self, result: &AutomatedTabStopRequirementResult) {
        debug!(requirement = %result.requirement_id, selector = ?result.selector, "tab stop instance");
    }

    fn automated_tabbing_results_completed(&self, results: &[AutomatedTabStopRequirementResult]) {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner) = Some(results.to_vec());
    }

    fn update_need_to_collect_tabbing_results(&self, need_to_collect: bool) {
        self.store
            .update(|data| data.tab_stops.need_to_collect_tabbing_results = need_to_collect);
    }
}

/// Start collection, let every window report, then stop
pub async fn collect(
    page: LoadedPage,
    scenario: &FrameScenario,
    config: &InsightsConfig,
) -> CliResult<FramesReport> {
    let browser = page.browser;
    let mut runners = Vec::new();
    let mut reporters = Vec::new();
    for (window_id, results) in page.reports {
        let window = Arc::new(browser.window(window_id)?);
        let target = Arc::new(TabStopsRequirementTarget::new());
        let runner = AllFrameRunner::<Results>::new(
            window.clone(),
            window,
            target.clone(),
            &config.frame_runner,
        );
        runner.initialize();
        runners.push(runner);
        reporters.push((target, results));
    }

    let store = StateStore::new(VisualizationScanResultData {
        tab_stops: TabStopsScanResultData {
            tabbing_completed: false,
            need_to_collect_tabbing_results: scenario.need_to_collect,
        },
    });
    let messages = Arc::new(ScanStoreMessages {
        store: store.clone(),
        completed: Mutex::new(None),
    });
    // window creation order puts the top window first
    let top_runner = runners
        .first()
        .cloned()
        .ok_or_else(|| CliError::run("page has no top window"))?;
    let flags = StateStore::new(
        FeatureFlagStoreData::default()
            .with(FeatureFlag::TabStopsAutomation, scenario.tab_stops_automation),
    );
    let processor =
        TabStopsRequirementResultProcessor::new(flags, top_runner, messages.clone(), store.clone());

    processor.start().await?;
    let collecting_windows = reporters
        .iter()
        .filter(|(target, _)| target.is_active())
        .count();
    info!(windows = reporters.len(), collecting_windows, "collection started");

    for (target, results) in &reporters {
        target.report(results.clone()).await?;
    }
    if scenario.tabbing_completed {
        store.update(|data| data.tab_stops.tabbing_completed = true);
    }
    processor.stop().await?;

    let completed = messages
        .completed
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Ok(FramesReport {
        windows: reporters.len(),
        collecting_windows,
        results: processor.unique_results(),
        completed,
    })
}

/// Execute the frames command
pub fn execute_frames(config: &CliConfig, args: &FramesArgs) -> CliResult<()> {
    let insights = load_insights_config(args.config.as_deref())?;
    let scenario = FrameScenario::from_path(&args.scenario)?;
    let page = scenario.load()?;

    let report = runtime()?.block_on(collect(page, &scenario, &insights))?;

    let reporter = Reporter::from_config(config, args.format);
    if reporter.is_json() {
        return reporter.json(&report);
    }
    print_report(&reporter, &report);
    Ok(())
}

fn print_report(reporter: &Reporter, report: &FramesReport) {
    reporter.header("Tab stops");
    if report.collecting_windows == 0 {
        reporter.info("Tab stop collection off or not needed; nothing collected");
        return;
    }
    reporter.info(&format!(
        "{} of {} windows collecting",
        report.collecting_windows, report.windows
    ));
    for result in &report.results {
        reporter.item(&format!(
            "{} {}: {}",
            result.requirement_id,
            result.selector.join(" > "),
            result.description
        ));
    }
    reporter.success(&format!("{} unique results", report.results.len()));
    if let Some(completed) = &report.completed {
        reporter.success(&format!("Tabbing completed with {} results", completed.len()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scenario(yaml: &str) -> FrameScenario {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    async fn run(scenario: &FrameScenario) -> FramesReport {
        collect(scenario.load().unwrap(), scenario, &InsightsConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_nested_results_reach_top() {
        let scenario = scenario(
            r##"
results:
  - requirement: tab-order
    selector: "#nav"
frames:
  - selector: "iframe#outer"
    frames:
      - selector: "iframe#inner"
        results:
          - requirement: keyboard-traps
            selector: "#dialog"
          - requirement: keyboard-traps
            selector: "#dialog"
"##,
        );
        let report = run(&scenario).await;

        assert_eq!(report.windows, 3);
        assert_eq!(report.collecting_windows, 3);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[1].selector, vec!["iframe#outer", "iframe#inner", "#dialog"]);
        assert_eq!(report.completed.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresponsive_and_sandboxed_frames_skipped() {
        let scenario = scenario(
            r##"
frames:
  - selector: "iframe#silent"
    responsive: false
    results:
      - requirement: input-focus
        selector: "#a"
  - selector: "iframe#locked"
    sandbox: allow-forms
    results:
      - requirement: input-focus
        selector: "#b"
  - selector: "iframe#open"
    results:
      - requirement: input-focus
        selector: "#c"
"##,
        );
        let report = run(&scenario).await;

        assert_eq!(report.windows, 4);
        assert_eq!(report.collecting_windows, 2);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].selector, vec!["iframe#open", "#c"]);
    }

    #[tokio::test]
    async fn test_not_needed_collects_nothing() {
        let scenario = scenario("need_to_collect: false\nresults:\n  - requirement: tab-order\n    selector: '#nav'\n");
        let report = run(&scenario).await;
        assert_eq!(report.collecting_windows, 0);
        assert!(report.results.is_empty());
        assert!(report.completed.is_none());
    }

    #[tokio::test]
    async fn test_automation_off_collects_nothing() {
        let scenario = scenario("tab_stops_automation: false\nresults:\n  - requirement: tab-order\n    selector: '#nav'\n");
        let report = run(&scenario).await;
        assert_eq!(report.collecting_windows, 0);
        assert!(report.results.is_empty());
    }

    #[tokio::test]
    async fn test_tabbing_not_completed() {
        let scenario = scenario("tabbing_completed: false\nresults:\n  - requirement: tab-order\n    selector: '#nav'\n");
        let report = run(&scenario).await;
        assert_eq!(report.results.len(), 1);
        assert!(report.completed.is_none());
    }
}
