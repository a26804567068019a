//! Collects tab-stop results from every frame and relays the unique ones.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::result::{AutomatedTabStopRequirementResult, TabStopsScanResultData, VisualizationScanResultData};
use crate::frame_runner::FrameRunner;
use crate::result::InsightsResult;
use crate::settings::{FeatureFlag, FeatureFlagStoreData};
use crate::store::{ListenerId, StateStore};

type Results = Vec<AutomatedTabStopRequirementResult>;

/// Where the processor sends what it collected
pub trait TabStopRequirementActionMessageCreator: Send + Sync {
    /// A result not seen before
    fn add_tab_stop_instance(&self, result: &AutomatedTabStopRequirementResult);

    /// Every unique result, once tabbing is done
    fn automated_tabbing_results_completed(&self, results: &[AutomatedTabStopRequirementResult]);

    /// Whether automated results are still wanted
    fn update_need_to_collect_tabbing_results(&self, need_to_collect: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Collecting,
    Stopped,
}

#[derive(Debug)]
struct ProcessorState {
    phase: Phase,
    unique_results: Results,
    seen: HashSet<AutomatedTabStopRequirementResult>,
    listener: Option<ListenerId>,
    collection_end_signalled: bool,
}

struct Shared {
    message_creator: Arc<dyn TabStopRequirementActionMessageCreator>,
    state: Mutex<ProcessorState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ProcessorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_results(&self, results: Results) {
        let fresh: Results = {
            let mut state = self.lock();
            if state.phase != Phase::Collecting {
                debug!(count = results.len(), "dropping tab stop results outside collection");
                return;
            }
            let fresh: Results = results
                .into_iter()
                .filter(|result| state.seen.insert(result.clone()))
                .collect();
            state.unique_results.extend(fresh.iter().cloned());
            fresh
        };
        for result in &fresh {
            self.message_creator.add_tab_stop_instance(result);
        }
    }

    /// Send the completed results and stop asking for more, at most once
    fn finish_collecting(&self, scan: TabStopsScanResultData) {
        if !(scan.tabbing_completed && scan.need_to_collect_tabbing_results) {
            return;
        }
        let results = {
            let mut state = self.lock();
            if state.collection_end_signalled {
                return;
            }
            state.collection_end_signalled = true;
            state.unique_results.clone()
        };
        info!(count = results.len(), "tab stop collection complete");
        self.message_creator.automated_tabbing_results_completed(&results);
        self.message_creator.update_need_to_collect_tabbing_results(false);
    }
}

/// Owns the tab-stop runner for one page.
///
/// Nothing runs unless [`FeatureFlag::TabStopsAutomation`] is on.
/// [`start`](Self::start) and [`stop`](Self::stop) are idempotent. Results
/// reaching the top window are deduplicated by content before being passed
/// to the message creator. When the scan store reports that tabbing is done,
/// the collected results are sent once and collection is switched off; the
/// runner keeps running until `stop`.
pub struct TabStopsRequirementResultProcessor {
    feature_flag_store: StateStore<FeatureFlagStoreData>,
    runner: Arc<dyn FrameRunner<Results>>,
    scan_result_store: StateStore<VisualizationScanResultData>,
    shared: Arc<Shared>,
}

impl fmt::Debug for TabStopsRequirementResultProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabStopsRequirementResultProcessor")
            .field("state", &*self.shared.lock())
            .finish_non_exhaustive()
    }
}

impl TabStopsRequirementResultProcessor {
    /// Create an idle processor; nothing is registered until `start`
    #[must_use]
    pub fn new(
        feature_flag_store: StateStore<FeatureFlagStoreData>,
        runner: Arc<dyn FrameRunner<Results>>,
        message_creator: Arc<dyn TabStopRequirementActionMessageCreator>,
        scan_result_store: StateStore<VisualizationScanResultData>,
    ) -> Self {
        Self {
            feature_flag_store,
            runner,
            scan_result_store,
            shared: Arc::new(Shared {
                message_creator,
                state: Mutex::new(ProcessorState {
                    phase: Phase::Idle,
                    unique_results: Vec::new(),
                    seen: HashSet::new(),
                    listener: None,
                    collection_end_signalled: false,
                }),
            }),
        }
    }

    /// Start collecting if automation is on and the scan still needs
    /// tab-stop results.
    ///
    /// Does nothing when already started, after [`stop`](Self::stop), when
    /// the flag is off or when the store says no results are needed. If the
    /// runner fails to start, the processor is left idle with no listener
    /// registered and the error is returned.
    pub async fn start(&self) -> InsightsResult<()> {
        {
            let mut state = self.shared.lock();
            if state.phase != Phase::Idle {
                debug!(phase = ?state.phase, "tab stop processor already started");
                return Ok(());
            }
            if !self
                .feature_flag_store
                .get_state()
                .is_enabled(FeatureFlag::TabStopsAutomation)
            {
                debug!(flag = %FeatureFlag::TabStopsAutomation, "tab stop automation disabled");
                return Ok(());
            }
            if !self
                .scan_result_store
                .get_state()
                .tab_stops
                .need_to_collect_tabbing_results
            {
                debug!("tab stop results not needed");
                return Ok(());
            }
            state.phase = Phase::Collecting;
        }

        let on_results = Arc::clone(&self.shared);
        self.runner
            .set_top_window_callback(Arc::new(move |results| on_results.add_results(results)));

        let on_change = Arc::clone(&self.shared);
        let listener = self
            .scan_result_store
            .add_changed_listener(move |data| on_change.finish_collecting(data.tab_stops));
        self.shared.lock().listener = Some(listener);

        info!("tab stop collection started");
        if let Err(e) = self.runner.start().await {
            self.roll_back_start();
            warn!(error = %e, "tab stop runner failed to start");
            return Err(e);
        }
        Ok(())
    }

    fn roll_back_start(&self) {
        let listener = {
            let mut state = self.shared.lock();
            if state.phase != Phase::Collecting {
                return;
            }
            state.phase = Phase::Idle;
            state.listener.take()
        };
        if let Some(listener) = listener {
            self.scan_result_store.remove_changed_listener(listener);
        }
    }

    /// Stop the runner and send whatever was collected if tabbing is done.
    ///
    /// Only the first call has any effect.
    pub async fn stop(&self) -> InsightsResult<()> {
        let listener = {
            let mut state = self.shared.lock();
            if state.phase == Phase::Stopped {
                return Ok(());
            }
            state.phase = Phase::Stopped;
            state.listener.take()
        };
        if let Some(listener) = listener {
            self.scan_result_store.remove_changed_listener(listener);
        }

        let stopped = self.runner.stop().await;
        self.shared
            .finish_collecting(self.scan_result_store.get_state().tab_stops);
        info!("tab stop collection stopped");
        stopped
    }

    /// Unique results collected so far, in arrival order
    #[must_use]
    pub fn unique_results(&self) -> Results {
        self.shared.lock().unique_results.clone()
    }

    /// Whether results are being collected
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.shared.lock().phase == Phase::Collecting
    }

    /// Whether [`stop`](Self::stop) has run
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.lock().phase == Phase::Stopped
    }
}
