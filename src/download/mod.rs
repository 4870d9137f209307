//! Single-flight download, upload to the requester's channel and deferred cleanup.

mod error;
mod scheduler;

use crate::coordinator::CommandError;
use crate::executor::TaskExecutor;
use crate::provider::SearchProvider;
use crate::transport::{ChannelId, Transport, UserId};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

pub use error::{CleanupError, DownloadError};
pub use scheduler::DeletionScheduler;

const LOG_TARGET: &str = "r_playbot::download";

/// Holds the system-wide download slot. Dropping it frees the slot.
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct DownloadPipeline {
    in_flight: Arc<AtomicBool>,
    scheduler: DeletionScheduler,
    provider: Arc<dyn SearchProvider>,
    transport: Arc<dyn Transport>,
    download_dir: PathBuf,
    deletion_delay: Option<Duration>,
}

impl DownloadPipeline {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        transport: Arc<dyn Transport>,
        download_dir: PathBuf,
        deletion_delay: Option<Duration>,
    ) -> Self {
        DownloadPipeline {
            in_flight: Arc::new(AtomicBool::new(false)),
            scheduler: DeletionScheduler::new(transport.clone()),
            provider,
            transport,
            download_dir,
            deletion_delay,
        }
    }

    /// Claims the download slot, or `None` while another download holds it.
    pub fn try_claim(&self) -> Option<InFlightGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard {
                flag: self.in_flight.clone(),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn scheduler(&self) -> &DeletionScheduler {
        &self.scheduler
    }

    /// Admits a download of `link` for `user`, or refuses immediately if one is running.
    ///
    /// The slot is claimed here, on the command path, and released when the
    /// background task ends however it ends.
    #[instrument(skip(self, executor))]
    pub fn request_download(&self, executor: &TaskExecutor, user: UserId, link: String) -> Result<(), CommandError> {
        let guard = self
            .try_claim()
            .ok_or_else(|| CommandError::Busy("Download already in progress. Please wait.".to_string()))?;

        self.transport.notify_user(user, "Downloading audio. Please wait...");
        let pipeline = self.clone();
        executor.submit("download", async move {
            let _slot = guard;
            pipeline.run(user, &link).await;
        });
        Ok(())
    }

    async fn run(&self, user: UserId, link: &str) {
        match self.fetch_and_upload(user, link).await {
            Ok((path, channel)) => {
                let name = file_name(&path);
                info!(target: LOG_TARGET, "Delivered {} to channel {}", name, channel);
                self.transport
                    .notify_user(user, &format!("File {} downloaded and uploaded.", name));
                if let Some(delay) = self.deletion_delay {
                    self.scheduler.schedule(path, channel, delay);
                }
            }
            Err(e) => {
                error!(target: LOG_TARGET, "Download of {} failed: {}", link, e);
                self.transport
                    .notify_user(user, &format!("Error downloading or uploading: {}", e));
            }
        }
    }

    async fn fetch_and_upload(&self, user: UserId, link: &str) -> Result<(PathBuf, ChannelId), DownloadError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| DownloadError::Fetch(e.into()))?;
        let path = self.provider.fetch_audio(link, &self.download_dir).await?;

        let channel = self
            .transport
            .user_channel(user)
            .unwrap_or_else(|| self.transport.bot_channel());
        self.transport.send_file(channel, &path).await?;
        Ok((path, channel))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
