use crate::provider::ProviderError;
use crate::transport::TransportError;
use std::error::Error;
use std::io;

/// Failure of the fetch/upload half of the pipeline. Reported to the requester.
#[derive(Debug)]
pub enum DownloadError {
    Fetch(ProviderError),
    Upload(TransportError),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadError::Fetch(e) => write!(f, "{}", e),
            DownloadError::Upload(e) => write!(f, "Upload failed: {}", e),
        }
    }
}

impl Error for DownloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DownloadError::Fetch(e) => Some(e),
            DownloadError::Upload(e) => Some(e),
        }
    }
}

impl From<ProviderError> for DownloadError {
    fn from(e: ProviderError) -> Self {
        DownloadError::Fetch(e)
    }
}

impl From<TransportError> for DownloadError {
    fn from(e: TransportError) -> Self {
        DownloadError::Upload(e)
    }
}

/// Failure during deferred deletion. Only ever logged.
#[derive(Debug)]
pub enum CleanupError {
    /// No remote entry carries the file's name.
    RemoteMissing(String),
    Remote(TransportError),
    Local(io::Error),
}

impl std::fmt::Display for CleanupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanupError::RemoteMissing(name) => write!(f, "No remote file named {}", name),
            CleanupError::Remote(e) => write!(f, "Remote deletion failed: {}", e),
            CleanupError::Local(e) => write!(f, "Local deletion failed: {}", e),
        }
    }
}

impl Error for CleanupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CleanupError::Remote(e) => Some(e),
            CleanupError::Local(e) => Some(e),
            CleanupError::RemoteMissing(_) => None,
        }
    }
}

impl From<TransportError> for CleanupError {
    fn from(e: TransportError) -> Self {
        CleanupError::Remote(e)
    }
}

impl From<io::Error> for CleanupError {
    fn from(e: io::Error) -> Self {
        CleanupError::Local(e)
    }
}
