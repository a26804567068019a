//! Transport capabilities the frame runner is written against.
//!
//! A window sees its own document through [`FrameHost`] (which iframes it
//! contains, whether it is the top window, who its parent is) and talks to
//! other windows through [`FrameMessenger`]. Neither trait knows about the
//! DOM; the browser integration and [`SimulatedBrowser`](super::SimulatedBrowser)
//! both implement them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::message::{CommandMessage, CommandResponse};
use crate::result::{InsightsError, InsightsResult};

/// Identifies a browsing context (a window or an iframe's content window)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Identifies an `<iframe>` element inside a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub u64);

/// An `<iframe>` element as seen from its parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameElement {
    /// Element identifier
    pub id: FrameId,
    /// CSS selector locating the element in its document
    pub selector: String,
    /// Raw `sandbox` attribute, if present
    pub sandbox: Option<String>,
    /// The frame's content window, if it has one
    pub content_window: Option<WindowId>,
}

impl FrameElement {
    /// Create a frame element with no sandbox and no content window
    #[must_use]
    pub fn new(id: FrameId, selector: impl Into<String>) -> Self {
        Self {
            id,
            selector: selector.into(),
            sandbox: None,
            content_window: None,
        }
    }

    /// Set the content window
    #[must_use]
    pub const fn with_content_window(mut self, window: WindowId) -> Self {
        self.content_window = Some(window);
        self
    }

    /// Set the `sandbox` attribute
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: impl Into<String>) -> Self {
        self.sandbox = Some(sandbox.into());
        self
    }

    /// Whether scripts may run inside this frame
    #[must_use]
    pub fn allows_scripts(&self) -> bool {
        sandbox_allows_scripts(self.sandbox.as_deref())
    }
}

/// A missing `sandbox` attribute allows scripts; a present one must list
/// the `allow-scripts` token.
#[must_use]
pub fn sandbox_allows_scripts(sandbox: Option<&str>) -> bool {
    sandbox.map_or(true, |attr| {
        attr.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("allow-scripts"))
    })
}

/// Future returned by a message listener
pub type MessageFuture = BoxFuture<'static, InsightsResult<Option<CommandResponse>>>;

/// Listener invoked with a received message and the window that sent it
pub type MessageHandler =
    Arc<dyn Fn(CommandMessage, Option<WindowId>) -> MessageFuture + Send + Sync>;

/// The current window's view of its own document
pub trait FrameHost: Send + Sync {
    /// This window's identifier
    fn window_id(&self) -> WindowId;

    /// All `<iframe>` elements in the document, in DOM order
    fn frames(&self) -> Vec<FrameElement>;

    /// Whether this window is the top-level window
    fn is_top_window(&self) -> bool;

    /// The parent window, `None` for the top window
    fn parent_window(&self) -> Option<WindowId>;
}

/// Sends commands to other windows and dispatches commands received from them
#[async_trait]
pub trait FrameMessenger: Send + Sync {
    /// Send `message` to a frame's content window and wait for its response
    async fn send_message_to_frame(
        &self,
        frame: &FrameElement,
        message: CommandMessage,
    ) -> InsightsResult<Option<CommandResponse>> {
        if !frame.allows_scripts() {
            return Err(InsightsError::SandboxDisallowsScripts);
        }
        let window = frame
            .content_window
            .ok_or(InsightsError::MissingContentWindow)?;
        self.send_message_to_window(window, message).await
    }

    /// Send `message` to a window and wait for its response
    async fn send_message_to_window(
        &self,
        window: WindowId,
        message: CommandMessage,
    ) -> InsightsResult<Option<CommandResponse>>;

    /// Register the listener for `command`, replacing any previous one
    fn add_message_listener(&self, command: &str, handler: MessageHandler);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_sandbox_allows_scripts() {
        assert!(sandbox_allows_scripts(None));
    }

    #[test]
    fn test_sandbox_with_allow_scripts() {
        assert!(sandbox_allows_scripts(Some(
            "something allow-scripts something-else"
        )));
    }

    #[test]
    fn test_sandbox_without_allow_scripts() {
        assert!(!sandbox_allows_scripts(Some("")));
        assert!(!sandbox_allows_scripts(Some(
            "sandbox-attr that-doesnt include-script-allowance"
        )));
        assert!(!sandbox_allows_scripts(Some("allow-scripts-extra")));
    }

    #[test]
    fn test_frame_element_builder() {
        let frame = FrameElement::new(FrameId(4), "iframe#ads")
            .with_content_window(WindowId(9))
            .with_sandbox("allow-same-origin");
        assert_eq!(frame.content_window, Some(WindowId(9)));
        assert!(!frame.allows_scripts());
    }

    #[test]
    fn test_window_display() {
        assert_eq!(WindowId(3).to_string(), "window-3");
    }
}
