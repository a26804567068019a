//! Runs a [`FrameTarget`] in the current frame and every descendant frame.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{self, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::commands::RunnerCommands;
use super::target::{FrameTarget, ResultCallback};
use crate::config::FrameRunnerConfig;
use crate::messaging::{
    CommandMessage, CommandResponse, FrameElement, FrameHost, FrameMessenger, MessageHandler,
    WindowId,
};
use crate::result::{InsightsError, InsightsResult};

/// Receives results that reached the top window
pub type TopWindowCallback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// What a consumer needs from a runner
#[async_trait]
pub trait FrameRunner<T>: Send + Sync {
    /// Install the callback results are delivered to in the top window
    fn set_top_window_callback(&self, callback: TopWindowCallback<T>);

    /// Start the target here and in every respondable descendant frame
    async fn start(&self) -> InsightsResult<()>;

    /// Stop the target here and in every respondable descendant frame
    async fn stop(&self) -> InsightsResult<()>;
}

/// Drives one [`FrameTarget`] across a whole frame tree.
///
/// Every window runs its own `AllFrameRunner` with the same command suffix.
/// Start and stop fan out from the top window through the frames that
/// answered a liveness ping; results flow back toward the top window, being
/// transformed once per frame boundary.
///
/// The set of frames to message is discovered once, on the first command
/// that needs it, and reused for the runner's lifetime. Frames added later
/// are only picked up by an explicit [`rediscover`](Self::rediscover).
pub struct AllFrameRunner<T> {
    messenger: Arc<dyn FrameMessenger>,
    host: Arc<dyn FrameHost>,
    target: Arc<dyn FrameTarget<T>>,
    commands: RunnerCommands,
    ping_timeout: Duration,
    top_window_callback: Mutex<Option<TopWindowCallback<T>>>,
    frames_to_message: tokio::sync::Mutex<Option<Arc<[FrameElement]>>>,
    ping_rounds: AtomicUsize,
}

impl<T> fmt::Debug for AllFrameRunner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllFrameRunner")
            .field("window", &self.host.window_id())
            .field("commands", &self.commands)
            .field("ping_timeout", &self.ping_timeout)
            .field("ping_rounds", &self.ping_rounds.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T> AllFrameRunner<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a runner for the window described by `host`.
    ///
    /// Nothing is registered until [`initialize`](Self::initialize) is called.
    #[must_use]
    pub fn new(
        messenger: Arc<dyn FrameMessenger>,
        host: Arc<dyn FrameHost>,
        target: Arc<dyn FrameTarget<T>>,
        config: &FrameRunnerConfig,
    ) -> Arc<Self> {
        let commands = RunnerCommands::new(&config.command_prefix, target.command_suffix());
        Arc::new(Self {
            messenger,
            host,
            target,
            commands,
            ping_timeout: config.ping_timeout(),
            top_window_callback: Mutex::new(None),
            frames_to_message: tokio::sync::Mutex::new(None),
            ping_rounds: AtomicUsize::new(0),
        })
    }

    /// The commands this runner listens for
    #[must_use]
    pub const fn commands(&self) -> &RunnerCommands {
        &self.commands
    }

    /// How many discovery passes have pinged frames so far
    #[must_use]
    pub fn ping_rounds(&self) -> usize {
        self.ping_rounds.load(Ordering::Relaxed)
    }

    /// Register the four command listeners and the target's result callback.
    ///
    /// Listeners hold a weak reference; once the runner is dropped they fail
    /// with [`InsightsError::RunnerDropped`].
    pub fn initialize(self: &Arc<Self>) {
        self.listen(&self.commands.start, |runner, _message, _source| async move {
            runner.start().await?;
            Ok(None)
        });
        self.listen(&self.commands.stop, |runner, _message, _source| async move {
            runner.stop().await?;
            Ok(None)
        });
        self.listen(
            &self.commands.result_from_child,
            |runner, message, source| async move {
                runner.on_result_from_child_frame(message, source).await
            },
        );
        self.listen(&self.commands.ping, |runner, message, _source| async move {
            let refresh = message
                .payload
                .as_ref()
                .and_then(|payload| payload.get("refresh"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !refresh {
                return Ok(None);
            }
            let frames = runner.rediscover().await;
            Ok(Some(CommandResponse::with_payload(json!(frames.len()))))
        });

        let weak = Arc::downgrade(self);
        let command = self.commands.result_from_child.clone();
        let callback: ResultCallback<T> = Arc::new(move |payload| {
            let weak = weak.clone();
            let command = command.clone();
            async move {
                let runner = weak
                    .upgrade()
                    .ok_or(InsightsError::RunnerDropped { command })?;
                runner.report_results_through_frames(payload).await?;
                Ok(())
            }
            .boxed()
        });
        self.target.set_result_callback(callback);
        debug!(commands = %self.commands, window = %self.host.window_id(), "frame runner initialized");
    }

    fn listen<F, Fut>(self: &Arc<Self>, command: &str, handler: F)
    where
        F: Fn(Arc<Self>, CommandMessage, Option<WindowId>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InsightsResult<Option<CommandResponse>>> + Send + 'static,
    {
        let weak = Arc::downgrade(self);
        let name = command.to_string();
        let listener: MessageHandler = Arc::new(move |message, source| match weak.upgrade() {
            Some(runner) => handler(runner, message, source).boxed(),
            None => {
                let command = name.clone();
                async move { Err(InsightsError::RunnerDropped { command }) }.boxed()
            }
        });
        self.messenger.add_message_listener(command, listener);
    }

    /// Install the callback results are delivered to in the top window
    pub fn set_top_window_callback(&self, callback: TopWindowCallback<T>) {
        *self
            .top_window_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    /// Start the local target while propagating start to child frames
    pub async fn start(&self) -> InsightsResult<()> {
        debug!(command = %self.commands.start, window = %self.host.window_id(), "starting");
        let (local, propagated) = future::join(
            self.target.start(),
            self.send_command_to_frames(&self.commands.start),
        )
        .await;
        propagated?;
        local
    }

    /// Stop the local target while propagating stop to child frames
    pub async fn stop(&self) -> InsightsResult<()> {
        debug!(command = %self.commands.stop, window = %self.host.window_id(), "stopping");
        let (local, propagated) = future::join(
            self.target.stop(),
            self.send_command_to_frames(&self.commands.stop),
        )
        .await;
        propagated?;
        local
    }

    /// Ping every iframe in the document and keep those that answer in time.
    ///
    /// Each frame gets its own timeout. Failures are logged and the frame is
    /// left out; the order of the returned frames follows the document.
    pub async fn find_respondable_frames(&self) -> Vec<FrameElement> {
        let frames = self.host.frames();
        if frames.is_empty() {
            return Vec::new();
        }
        self.ping_rounds.fetch_add(1, Ordering::Relaxed);

        let pings = frames.into_iter().map(|frame| async move {
            match self.ping(&frame).await {
                Ok(()) => Some(frame),
                Err(err) => {
                    warn!(frame = %frame.selector, error = %err, "frame did not answer ping");
                    None
                }
            }
        });
        future::join_all(pings).await.into_iter().flatten().collect()
    }

    async fn ping(&self, frame: &FrameElement) -> InsightsResult<()> {
        let message = CommandMessage::new(self.commands.ping.as_str());
        tokio::time::timeout(
            self.ping_timeout,
            self.messenger.send_message_to_frame(frame, message),
        )
        .await
        .map_err(|_| InsightsError::Timeout {
            ms: u64::try_from(self.ping_timeout.as_millis()).unwrap_or(u64::MAX),
        })??;
        Ok(())
    }

    /// The respondable frames, discovered on first use and cached afterwards
    pub async fn discover_once(&self) -> Arc<[FrameElement]> {
        let mut cached = self.frames_to_message.lock().await;
        if let Some(frames) = cached.as_ref() {
            return Arc::clone(frames);
        }
        let frames: Arc<[FrameElement]> = self.find_respondable_frames().await.into();
        *cached = Some(Arc::clone(&frames));
        frames
    }

    /// Run discovery again and replace the cached frames.
    ///
    /// The frame cache stays locked for the whole ping round, up to one ping
    /// timeout. Commands sent meanwhile wait for it and then go to the frames
    /// it found.
    pub async fn rediscover(&self) -> Arc<[FrameElement]> {
        let mut cached = self.frames_to_message.lock().await;
        let frames: Arc<[FrameElement]> = self.find_respondable_frames().await.into();
        debug!(count = frames.len(), "frames rediscovered");
        *cached = Some(Arc::clone(&frames));
        frames
    }

    /// Send `command` to every respondable frame in parallel.
    ///
    /// The first failure is returned; frames that already received the
    /// command are not rolled back.
    pub async fn send_command_to_frames(&self, command: &str) -> InsightsResult<()> {
        let frames = self.discover_once().await;
        let sends = frames.iter().map(|frame| {
            self.messenger
                .send_message_to_frame(frame, CommandMessage::new(command))
        });
        future::try_join_all(sends).await?;
        Ok(())
    }

    /// Deliver a result to the top window callback or relay it to the parent
    pub async fn report_results_through_frames(
        &self,
        payload: T,
    ) -> InsightsResult<Option<CommandResponse>> {
        let encoded = serde_json::to_value(&payload)?;
        if self.host.is_top_window() {
            let callback = self
                .top_window_callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            match callback {
                Some(callback) => callback(payload),
                None => warn!(command = %self.commands.result_from_child, "no top window callback, result dropped"),
            }
            return Ok(Some(CommandResponse::with_payload(encoded)));
        }

        let parent = self
            .host
            .parent_window()
            .ok_or_else(|| InsightsError::MissingParentWindow {
                window: self.host.window_id().to_string(),
            })?;
        debug!(%parent, command = %self.commands.result_from_child, "relaying result to parent");
        let message = CommandMessage::new(self.commands.result_from_child.as_str()).with_payload(encoded);
        self.messenger.send_message_to_window(parent, message).await
    }

    /// Handle a result relayed by one of this window's child frames
    pub async fn on_result_from_child_frame(
        &self,
        message: CommandMessage,
        source: Option<WindowId>,
    ) -> InsightsResult<Option<CommandResponse>> {
        let source = source.ok_or(InsightsError::MissingSourceWindow)?;
        let frame = self
            .host
            .frames()
            .into_iter()
            .find(|frame| frame.content_window == Some(source))
            .ok_or(InsightsError::FrameNotFound)?;
        let payload: T = message.decode_payload()?;
        let transformed = self.target.transform_child_result_for_parent(payload, &frame);
        self.report_results_through_frames(transformed).await
    }
}

#[async_trait]
impl<T> FrameRunner<T> for AllFrameRunner<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn set_top_window_callback(&self, callback: TopWindowCallback<T>) {
        Self::set_top_window_callback(self, callback);
    }

    async fn start(&self) -> InsightsResult<()> {
        Self::start(self).await
    }

    async fn stop(&self) -> InsightsResult<()> {
        Self::stop(self).await
    }
}
