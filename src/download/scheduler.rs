//! Deferred deletion of uploaded files, keyed by local path.

use super::error::CleanupError;
use super::LOG_TARGET;
use crate::lock_unpoisoned as lock;
use crate::transport::{ChannelId, Transport};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct PendingDeletion {
    token: Uuid,
    handle: JoinHandle<()>,
}

/// One-shot delayed deletions, at most one per path.
///
/// Scheduling a path that already has a pending deletion aborts the old
/// timer and starts a fresh one.
#[derive(Clone)]
pub struct DeletionScheduler {
    transport: Arc<dyn Transport>,
    pending: Arc<Mutex<HashMap<PathBuf, PendingDeletion>>>,
}

impl DeletionScheduler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        DeletionScheduler {
            transport,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Deletes `path` remotely in `channel` and locally once `delay` has elapsed.
    pub fn schedule(&self, path: PathBuf, channel: ChannelId, delay: Duration) {
        let token = Uuid::new_v4();
        let transport = self.transport.clone();
        let pending = self.pending.clone();
        let key = path.clone();

        // Held across spawn and insert so the task cannot look for its entry before it exists.
        let mut entries = lock(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_cleanup(transport.as_ref(), channel, &path).await;

            let mut entries = lock(&pending);
            if entries.get(&path).map(|entry| entry.token) == Some(token) {
                entries.remove(&path);
            }
        });

        if let Some(previous) = entries.insert(key.clone(), PendingDeletion { token, handle }) {
            previous.handle.abort();
            info!(target: LOG_TARGET, "Rescheduled deletion of {} in {:?}", key.display(), delay);
        } else {
            info!(target: LOG_TARGET, "Scheduled deletion of {} in {:?}", key.display(), delay);
        }
    }

    /// Aborts every pending deletion. Files stay where they are.
    pub fn cancel_all(&self) {
        let mut entries = lock(&self.pending);
        for (path, entry) in entries.drain() {
            entry.handle.abort();
            debug!(target: LOG_TARGET, "Cancelled deletion of {}", path.display());
        }
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        lock(&self.pending).contains_key(path)
    }
}

async fn run_cleanup(transport: &dyn Transport, channel: ChannelId, path: &Path) {
    if let Err(e) = delete_remote(transport, channel, path).await {
        warn!(target: LOG_TARGET, "Cleanup of {}: {}", path.display(), e);
    }
    if let Err(e) = delete_local(path).await {
        warn!(target: LOG_TARGET, "Cleanup of {}: {}", path.display(), e);
    }
}

async fn delete_remote(transport: &dyn Transport, channel: ChannelId, path: &Path) -> Result<(), CleanupError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    // A re-upload of the same path leaves several entries under one name; all of them go.
    let matching: Vec<_> = transport
        .list_files(channel)
        .await?
        .into_iter()
        .filter(|file| file.name == name)
        .collect();
    if matching.is_empty() {
        return Err(CleanupError::RemoteMissing(name));
    }
    for file in matching {
        transport.delete_file(channel, file.id).await?;
        debug!(target: LOG_TARGET, "Deleted remote file {} ({})", file.name, file.id);
    }
    Ok(())
}

/// Removes the local copy. A file that is already gone is not an error.
async fn delete_local(path: &Path) -> Result<(), CleanupError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(target: LOG_TARGET, "Deleted local file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
