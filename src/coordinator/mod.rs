//! Playback session coordinator: the one place that owns the shared session,
//! routes commands to handlers and runs expensive work on the task executor.

use crate::commands::{self, Command};
use crate::config::Settings;
use crate::download::DownloadPipeline;
use crate::engine::MediaEngine;
use crate::executor::TaskExecutor;
use crate::provider::SearchProvider;
use crate::transport::{Transport, UserId};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

mod command_handler;
mod end_of_track;
mod error;
mod navigation;
mod state;

pub use error::CommandError;
pub use state::{PlaybackSession, SessionSnapshot, Step, StepRefusal, SwitchPhase};

const COORDINATOR_LOG_TARGET: &str = "r_playbot::coordinator";

pub(crate) struct Inner {
    engine: Arc<dyn MediaEngine>,
    provider: Arc<dyn SearchProvider>,
    transport: Arc<dyn Transport>,
    settings: Settings,
    session: PlaybackSession,
    downloads: DownloadPipeline,
    executor: TaskExecutor,
}

/// Handle to the coordinator. Clones share the same session.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Builds the coordinator and registers its end-of-track guard with the engine.
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        provider: Arc<dyn SearchProvider>,
        transport: Arc<dyn Transport>,
        settings: Settings,
    ) -> Self {
        let executor = TaskExecutor::new(settings.worker_threads);
        let downloads = DownloadPipeline::new(
            provider.clone(),
            transport.clone(),
            settings.download_dir.clone(),
            settings.deletion_delay(),
        );
        let inner = Arc::new(Inner {
            session: PlaybackSession::new(settings.history_capacity),
            engine,
            provider,
            transport,
            settings,
            downloads,
            executor,
        });

        // Weak: the engine holding a strong reference back would keep everything alive forever.
        let weak: Weak<Inner> = Arc::downgrade(&inner);
        inner.engine.set_end_of_track_callback(Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                end_of_track::on_playback_end(&inner);
            }
        }));

        info!(target: COORDINATOR_LOG_TARGET, "Coordinator ready (max volume {}, {} workers).", inner.settings.max_volume, inner.settings.worker_threads);
        Coordinator { inner }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.inner.session
    }

    pub fn downloads(&self) -> &DownloadPipeline {
        &self.inner.downloads
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Parses one line from `user` and dispatches it. Plain chat is ignored.
    pub async fn handle_text(&self, user: UserId, text: &str) {
        match commands::parse(text, &self.inner.settings.command_prefix) {
            Ok(Some(command)) => self.dispatch(user, command).await,
            Ok(None) => trace!(target: COORDINATOR_LOG_TARGET, user, "Ignoring non-command text."),
            Err(e) => self.inner.transport.notify_user(user, &e.to_string()),
        }
    }

    /// Runs one command. Errors become a private notice to `user`.
    #[instrument(skip(self))]
    pub async fn dispatch(&self, user: UserId, command: Command) {
        debug!(target: COORDINATOR_LOG_TARGET, "Dispatching {:?}", command);
        let result = match command {
            Command::PlayUrl(link) => command_handler::handle_play_url(self, user, link),
            Command::PlayOrPause(Some(query)) => command_handler::handle_search(self, user, query),
            Command::PlayOrPause(None) => command_handler::handle_toggle_pause(self, user).await,
            Command::Next => command_handler::handle_navigate(self, user, Step::Next),
            Command::Previous => command_handler::handle_navigate(self, user, Step::Previous),
            Command::Volume(value) => command_handler::handle_volume(self, user, value).await,
            Command::GetLink => command_handler::handle_get_link(self, user),
            Command::Duration => command_handler::handle_duration(self, user),
            Command::History(None) => command_handler::handle_recent_history(self, user),
            Command::History(Some(index)) => command_handler::handle_play_from_history(self, user, index),
            Command::Download(link) => command_handler::handle_download(self, user, link),
            Command::Stop => command_handler::handle_stop(self, user).await,
            Command::Seek { direction, amount } => command_handler::handle_seek(self, user, direction, amount).await,
            Command::Help => {
                self.inner
                    .transport
                    .notify_user(user, &commands::help_text(&self.inner.settings.command_prefix));
                Ok(())
            }
        };

        if let Err(e) = result {
            self.report_error(user, &e);
        }
    }

    /// Waits until every background task submitted so far has finished.
    pub async fn wait_idle(&self) {
        self.inner.executor.wait_idle().await;
    }

    /// Cancels pending deletions and drains the executor.
    pub async fn shutdown(&self, timeout: Duration) {
        info!(target: COORDINATOR_LOG_TARGET, "Coordinator shutting down.");
        self.inner.downloads.scheduler().cancel_all();
        self.inner.executor.shutdown(timeout).await;
    }

    fn report_error(&self, user: UserId, error: &CommandError) {
        match error {
            CommandError::Engine(_) | CommandError::Provider(_) => {
                warn!(target: COORDINATOR_LOG_TARGET, user, "Command failed: {}", error)
            }
            _ => debug!(target: COORDINATOR_LOG_TARGET, user, "Command refused: {}", error),
        }
        self.inner.transport.notify_user(user, &error.to_string());
    }

    /// Rejects requesters outside the bot's channel.
    fn ensure_same_channel(&self, user: UserId) -> Result<(), CommandError> {
        let bot_channel = self.inner.transport.bot_channel();
        if self.inner.transport.user_channel(user) == Some(bot_channel) {
            Ok(())
        } else {
            Err(CommandError::Permission)
        }
    }

    fn idle_status(&self) {
        self.inner.transport.set_status(&self.inner.settings.status_message);
    }

    fn playing_status(&self) {
        let title = self.inner.engine.status().media_title;
        self.inner.transport.set_status(&format!("Playing: {}", title));
    }
}
