//! Chat and file-transfer contract the coordinator talks through

pub mod console;
mod error;

use async_trait::async_trait;
use std::path::Path;

pub use console::ConsoleTransport;
pub use error::TransportError;

pub type UserId = i32;
pub type ChannelId = i32;
pub type FileId = i32;

/// A file stored in a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: FileId,
    pub name: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a private message to one user.
    fn notify_user(&self, user: UserId, text: &str);

    /// Sends a message to the bot's current channel.
    fn notify_channel(&self, text: &str);

    fn set_status(&self, text: &str);

    /// Enables or disables outbound audio.
    fn set_voice_transmission(&self, enabled: bool);

    fn bot_channel(&self) -> ChannelId;

    /// Channel the user currently sits in, `None` for unknown users.
    fn user_channel(&self, user: UserId) -> Option<ChannelId>;

    fn nickname(&self, user: UserId) -> String;

    async fn send_file(&self, channel: ChannelId, path: &Path) -> Result<(), TransportError>;

    async fn list_files(&self, channel: ChannelId) -> Result<Vec<RemoteFile>, TransportError>;

    async fn delete_file(&self, channel: ChannelId, file_id: FileId) -> Result<(), TransportError>;
}
