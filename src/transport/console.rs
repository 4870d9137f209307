//! Single-user transport for running the bot from a terminal.
//!
//! Messages go to stdout, uploads are copied into a share directory that
//! plays the role of the channel's file area.

use super::{ChannelId, FileId, RemoteFile, Transport, TransportError, UserId};
use crate::lock_unpoisoned as lock;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

const LOG_TARGET: &str = "r_playbot::transport::console";

pub const CONSOLE_USER: UserId = 1;
pub const CONSOLE_CHANNEL: ChannelId = 1;

pub struct ConsoleTransport {
    nickname: String,
    share_dir: PathBuf,
    files: Mutex<BTreeMap<FileId, PathBuf>>,
    next_file_id: Mutex<FileId>,
}

impl ConsoleTransport {
    pub fn new(nickname: impl Into<String>, share_dir: impl Into<PathBuf>) -> Self {
        ConsoleTransport {
            nickname: nickname.into(),
            share_dir: share_dir.into(),
            files: Mutex::new(BTreeMap::new()),
            next_file_id: Mutex::new(1),
        }
    }

    pub fn share_dir(&self) -> &Path {
        &self.share_dir
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn notify_user(&self, _user: UserId, text: &str) {
        println!("[private] {}", text);
    }

    fn notify_channel(&self, text: &str) {
        println!("[channel] {}", text);
    }

    fn set_status(&self, text: &str) {
        println!("[status] {}", text);
    }

    fn set_voice_transmission(&self, enabled: bool) {
        debug!(target: LOG_TARGET, enabled, "Voice transmission toggled.");
    }

    fn bot_channel(&self) -> ChannelId {
        CONSOLE_CHANNEL
    }

    fn user_channel(&self, user: UserId) -> Option<ChannelId> {
        (user == CONSOLE_USER).then_some(CONSOLE_CHANNEL)
    }

    fn nickname(&self, _user: UserId) -> String {
        self.nickname.clone()
    }

    async fn send_file(&self, channel: ChannelId, path: &Path) -> Result<(), TransportError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| TransportError::NotFound(format!("{} has no file name", path.display())))?;
        tokio::fs::create_dir_all(&self.share_dir).await?;
        let target = self.share_dir.join(file_name);
        tokio::fs::copy(path, &target).await?;

        let file_id = {
            let mut next = lock(&self.next_file_id);
            let id = *next;
            *next += 1;
            id
        };
        let mut files = lock(&self.files);
        // A re-upload under the same name replaces the earlier entry.
        files.retain(|_, existing| existing != &target);
        files.insert(file_id, target.clone());
        info!(target: LOG_TARGET, channel, file_id, "Uploaded {}", target.display());
        Ok(())
    }

    async fn list_files(&self, _channel: ChannelId) -> Result<Vec<RemoteFile>, TransportError> {
        let files = lock(&self.files);
        Ok(files
            .iter()
            .filter(|(_, path)| path.exists())
            .filter_map(|(id, path)| {
                path.file_name().map(|name| RemoteFile {
                    id: *id,
                    name: name.to_string_lossy().into_owned(),
                })
            })
            .collect())
    }

    async fn delete_file(&self, channel: ChannelId, file_id: FileId) -> Result<(), TransportError> {
        let path = lock(&self.files)
            .remove(&file_id)
            .ok_or_else(|| TransportError::NotFound(format!("file {} in channel {}", file_id, channel)))?;
        tokio::fs::remove_file(&path).await?;
        info!(target: LOG_TARGET, channel, file_id, "Deleted {}", path.display());
        Ok(())
    }
}
