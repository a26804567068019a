//! In-memory browser with a tree of windows and iframes.
//!
//! Every window gets a [`SimulatedWindow`] endpoint that implements both
//! [`FrameHost`] and [`FrameMessenger`], so frame runners can be wired up
//! exactly as they would be in a page. Messages and responses are
//! round-tripped through JSON on delivery, so nothing shared by reference
//! survives the hop.
//!
//! Delivery rules:
//! - a window marked unresponsive never answers
//! - a command with no registered listener never answers
//! - an unknown window fails with [`InsightsError::WindowUnreachable`]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::trace;

use super::message::{CommandMessage, CommandResponse};
use super::transport::{FrameElement, FrameHost, FrameId, FrameMessenger, MessageHandler, WindowId};
use crate::result::{InsightsError, InsightsResult};

/// One message handed to a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Sending window
    pub from: WindowId,
    /// Receiving window
    pub to: WindowId,
    /// Command name
    pub command: String,
}

#[derive(Default)]
struct WindowState {
    parent: Option<WindowId>,
    frames: Vec<FrameElement>,
    listeners: HashMap<String, MessageHandler>,
    unresponsive: bool,
}

#[derive(Default)]
struct BrowserState {
    next_window: u64,
    next_frame: u64,
    windows: BTreeMap<WindowId, WindowState>,
    deliveries: Vec<Delivery>,
}

impl BrowserState {
    fn allocate_window(&mut self, parent: Option<WindowId>) -> WindowId {
        let id = WindowId(self.next_window);
        self.next_window += 1;
        self.windows.insert(
            id,
            WindowState {
                parent,
                ..WindowState::default()
            },
        );
        id
    }

    fn allocate_frame(&mut self) -> FrameId {
        let id = FrameId(self.next_frame);
        self.next_frame += 1;
        id
    }

    fn window_mut(&mut self, id: WindowId) -> InsightsResult<&mut WindowState> {
        self.windows
            .get_mut(&id)
            .ok_or_else(|| InsightsError::WindowUnreachable {
                window: id.to_string(),
            })
    }
}

/// A simulated page: one top window plus any number of nested iframes
#[derive(Clone)]
pub struct SimulatedBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl fmt::Debug for SimulatedBrowser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("SimulatedBrowser")
            .field("windows", &state.windows.len())
            .field("deliveries", &state.deliveries.len())
            .finish()
    }
}

impl Default for SimulatedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBrowser {
    /// Create a browser containing only the top window
    #[must_use]
    pub fn new() -> Self {
        let mut state = BrowserState::default();
        state.allocate_window(None);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The top window
    #[must_use]
    pub const fn top(&self) -> WindowId {
        WindowId(0)
    }

    /// Append an iframe with its own content window to `parent`
    pub fn add_frame(
        &self,
        parent: WindowId,
        selector: impl Into<String>,
    ) -> InsightsResult<WindowId> {
        let mut state = self.lock();
        state.window_mut(parent)?;
        let frame_id = state.allocate_frame();
        let child = state.allocate_window(Some(parent));
        let frame = FrameElement::new(frame_id, selector).with_content_window(child);
        state.window_mut(parent)?.frames.push(frame);
        Ok(child)
    }

    /// Append an iframe carrying a `sandbox` attribute to `parent`
    pub fn add_sandboxed_frame(
        &self,
        parent: WindowId,
        selector: impl Into<String>,
        sandbox: impl Into<String>,
    ) -> InsightsResult<WindowId> {
        let mut state = self.lock();
        state.window_mut(parent)?;
        let frame_id = state.allocate_frame();
        let child = state.allocate_window(Some(parent));
        let frame = FrameElement::new(frame_id, selector)
            .with_content_window(child)
            .with_sandbox(sandbox);
        state.window_mut(parent)?.frames.push(frame);
        Ok(child)
    }

    /// Append an iframe that has no content window to `parent`
    pub fn add_detached_frame(
        &self,
        parent: WindowId,
        selector: impl Into<String>,
    ) -> InsightsResult<FrameId> {
        let mut state = self.lock();
        state.window_mut(parent)?;
        let frame_id = state.allocate_frame();
        state
            .window_mut(parent)?
            .frames
            .push(FrameElement::new(frame_id, selector));
        Ok(frame_id)
    }

    /// Make a window stop answering messages
    pub fn set_unresponsive(&self, window: WindowId, unresponsive: bool) -> InsightsResult<()> {
        self.lock().window_mut(window)?.unresponsive = unresponsive;
        Ok(())
    }

    /// The endpoint a window uses to inspect its document and send messages
    pub fn window(&self, id: WindowId) -> InsightsResult<SimulatedWindow> {
        if !self.lock().windows.contains_key(&id) {
            return Err(InsightsError::WindowUnreachable {
                window: id.to_string(),
            });
        }
        Ok(SimulatedWindow {
            browser: self.clone(),
            id,
        })
    }

    /// All windows in creation order, top window first
    #[must_use]
    pub fn windows(&self) -> Vec<WindowId> {
        self.lock().windows.keys().copied().collect()
    }

    /// Every message handed to a window so far
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().deliveries.clone()
    }

    /// Number of deliveries of `command` to `window`
    #[must_use]
    pub fn delivery_count(&self, window: WindowId, command: &str) -> usize {
        self.lock()
            .deliveries
            .iter()
            .filter(|d| d.to == window && d.command == command)
            .count()
    }

    async fn deliver(
        &self,
        from: WindowId,
        to: WindowId,
        message: CommandMessage,
    ) -> InsightsResult<Option<CommandResponse>> {
        let message: CommandMessage = serde_json::from_str(&serde_json::to_string(&message)?)?;

        let handler = {
            let mut state = self.lock();
            let target = state.window_mut(to)?;
            if target.unresponsive {
                None
            } else {
                let handler = target.listeners.get(&message.command).cloned();
                state.deliveries.push(Delivery {
                    from,
                    to,
                    command: message.command.clone(),
                });
                handler
            }
        };

        let Some(handler) = handler else {
            trace!(%from, %to, command = %message.command, "message will never be answered");
            return futures::future::pending().await;
        };

        let response = handler(message, Some(from)).await?;
        match response {
            Some(response) => Ok(Some(serde_json::from_str(&serde_json::to_string(
                &response,
            )?)?)),
            None => Ok(None),
        }
    }
}

/// A window's endpoint inside a [`SimulatedBrowser`]
#[derive(Clone)]
pub struct SimulatedWindow {
    browser: SimulatedBrowser,
    id: WindowId,
}

impl fmt::Debug for SimulatedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedWindow").field("id", &self.id).finish()
    }
}

impl SimulatedWindow {
    /// Whether a listener is registered for `command`
    #[must_use]
    pub fn has_listener(&self, command: &str) -> bool {
        self.browser
            .lock()
            .windows
            .get(&self.id)
            .is_some_and(|w| w.listeners.contains_key(command))
    }
}

impl FrameHost for SimulatedWindow {
    fn window_id(&self) -> WindowId {
        self.id
    }

    fn frames(&self) -> Vec<FrameElement> {
        self.browser
            .lock()
            .windows
            .get(&self.id)
            .map(|w| w.frames.clone())
            .unwrap_or_default()
    }

    fn is_top_window(&self) -> bool {
        self.parent_window().is_none()
    }

    fn parent_window(&self) -> Option<WindowId> {
        self.browser
            .lock()
            .windows
            .get(&self.id)
            .and_then(|w| w.parent)
    }
}

#[async_trait]
impl FrameMessenger for SimulatedWindow {
    async fn send_message_to_window(
        &self,
        window: WindowId,
        message: CommandMessage,
    ) -> InsightsResult<Option<CommandResponse>> {
        self.browser.deliver(self.id, window, message).await
    }

    fn add_message_listener(&self, command: &str, handler: MessageHandler) {
        if let Some(window) = self.browser.lock().windows.get_mut(&self.id) {
            window.listeners.insert(command.to_string(), handler);
        }
    }
}
