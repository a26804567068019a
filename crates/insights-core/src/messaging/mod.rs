//! Cross-window messaging.
//!
//! The wire types, the transport traits, and an in-memory browser used by
//! tests and the CLI.

mod message;
mod simulated;
mod transport;

pub use message::{CommandMessage, CommandResponse};
pub use simulated::{Delivery, SimulatedBrowser, SimulatedWindow};
pub use transport::{
    sandbox_allows_scripts, FrameElement, FrameHost, FrameId, FrameMessenger, MessageFuture,
    MessageHandler, WindowId,
};
