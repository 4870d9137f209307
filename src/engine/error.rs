use std::error::Error;
use std::io;

/// Error types reported by a media engine.
#[derive(Debug)]
pub enum EngineError {
    ProcessError(String),
    IpcError(String),
    IoError(io::Error),
    JsonError(serde_json::Error),
    LoadFailed(String),
    CommandRejected(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ProcessError(e) => write!(f, "Engine process error: {}", e),
            EngineError::IpcError(e) => write!(f, "Engine IPC error: {}", e),
            EngineError::IoError(e) => write!(f, "I/O error: {}", e),
            EngineError::JsonError(e) => write!(f, "Malformed engine message: {}", e),
            EngineError::LoadFailed(s) => write!(f, "Failed to load track: {}", s),
            EngineError::CommandRejected(s) => write!(f, "Engine rejected command: {}", s),
        }
    }
}

impl Error for EngineError {}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        EngineError::IoError(e)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::JsonError(e)
    }
}
