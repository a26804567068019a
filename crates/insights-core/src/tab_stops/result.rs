//! Tab-stop requirement results and the scan state that gates collecting them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::InsightsError;

/// Keyboard requirements checked while tabbing through a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TabStopRequirementId {
    /// Focus can enter an element but not leave it
    KeyboardTraps,
    /// Tab order does not follow the visual order
    TabOrder,
    /// An interactive element cannot receive focus
    InputFocus,
    /// Focus is not visible
    FocusIndicator,
    /// A widget cannot be operated from the keyboard
    KeyboardNavigation,
}

impl TabStopRequirementId {
    /// Every requirement, in display order
    pub const ALL: [Self; 5] = [
        Self::KeyboardTraps,
        Self::TabOrder,
        Self::InputFocus,
        Self::FocusIndicator,
        Self::KeyboardNavigation,
    ];

    /// The wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeyboardTraps => "keyboard-traps",
            Self::TabOrder => "tab-order",
            Self::InputFocus => "input-focus",
            Self::FocusIndicator => "focus-indicator",
            Self::KeyboardNavigation => "keyboard-navigation",
        }
    }
}

impl fmt::Display for TabStopRequirementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TabStopRequirementId {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| InsightsError::invalid_config(format!("unknown tab stop requirement: {s}")))
    }
}

/// One violation found by the automated tab-stop checks.
///
/// `selector` is a path: one entry per frame boundary, outermost first,
/// ending with the element's selector inside its own document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedTabStopRequirementResult {
    /// Requirement that failed
    pub requirement_id: TabStopRequirementId,
    /// What is wrong
    pub description: String,
    /// Frame path to the element
    pub selector: Vec<String>,
    /// Element markup
    pub html: String,
}

impl AutomatedTabStopRequirementResult {
    /// A result for the element at `selector` in the reporting frame
    #[must_use]
    pub fn new(
        requirement_id: TabStopRequirementId,
        description: impl Into<String>,
        selector: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            requirement_id,
            description: description.into(),
            selector: vec![selector.into()],
            html: html.into(),
        }
    }
}

/// Tab-stop portion of the visualization scan state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabStopsScanResultData {
    /// The user finished tabbing through the page
    pub tabbing_completed: bool,
    /// Automated results are still wanted
    pub need_to_collect_tabbing_results: bool,
}

/// Visualization scan state the tab-stop processor watches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationScanResultData {
    /// Tab-stops scan state
    pub tab_stops: TabStopsScanResultData,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requirement_id_names() {
        for id in TabStopRequirementId::ALL {
            assert_eq!(id.as_str().parse::<TabStopRequirementId>().unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), json!(id.as_str()));
        }
        assert!("tab-trap".parse::<TabStopRequirementId>().is_err());
    }

    #[test]
    fn test_result_wire_shape() {
        let result = AutomatedTabStopRequirementResult::new(
            TabStopRequirementId::FocusIndicator,
            "no visible focus",
            "#submit",
            "<button id=\"submit\">",
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "requirementId": "focus-indicator",
                "description": "no visible focus",
                "selector": ["#submit"],
                "html": "<button id=\"submit\">",
            })
        );
    }

    #[test]
    fn test_scan_state_defaults() {
        let data: VisualizationScanResultData =
            serde_json::from_value(json!({"tabStops": {"tabbingCompleted": true, "needToCollectTabbingResults": false}}))
                .unwrap();
        assert!(data.tab_stops.tabbing_completed);
        assert_eq!(VisualizationScanResultData::default().tab_stops, TabStopsScanResultData::default());
    }
}
