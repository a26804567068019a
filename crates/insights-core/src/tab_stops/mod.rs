//! Tab-stop requirement results gathered from every frame of a page.
//!
//! Each frame runs a [`TabStopsRequirementTarget`] under an
//! [`AllFrameRunner`](crate::frame_runner::AllFrameRunner); the top window's
//! [`TabStopsRequirementResultProcessor`] deduplicates what arrives and hands
//! it to a [`TabStopRequirementActionMessageCreator`].

mod processor;
mod result;
mod target;

pub use processor::{TabStopRequirementActionMessageCreator, TabStopsRequirementResultProcessor};
pub use result::{
    AutomatedTabStopRequirementResult, TabStopRequirementId, TabStopsScanResultData,
    VisualizationScanResultData,
};
pub use target::TabStopsRequirementTarget;
