use crate::engine::EngineError;
use std::error::Error;

/// Errors a command can end with. The `Display` text is the notice sent
/// privately to the requester.
#[derive(Debug)]
pub enum CommandError {
    /// Malformed or missing arguments; carries the usage hint.
    Usage(String),
    /// Requester is not in the bot's channel.
    Permission,
    /// Operation refused because of the current state (download running, list bounds, ...).
    Busy(String),
    NothingPlaying,
    /// Search or download failure, with the underlying message.
    Provider(String),
    Engine(EngineError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Usage(hint) => write!(f, "{}", hint),
            CommandError::Permission => write!(f, "You are not in the same channel"),
            CommandError::Busy(reason) => write!(f, "{}", reason),
            CommandError::NothingPlaying => write!(f, "Nothing is currently playing"),
            CommandError::Provider(detail) => write!(f, "{}", detail),
            CommandError::Engine(e) => write!(f, "Playback error: {}", e),
        }
    }
}

impl Error for CommandError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CommandError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for CommandError {
    fn from(e: EngineError) -> Self {
        CommandError::Engine(e)
    }
}
