use std::error::Error;
use std::io;

/// Error types for search and download operations.
#[derive(Debug)]
pub enum ProviderError {
    ProcessError(String),
    IoError(io::Error),
    InvalidResponse(String),
    DownloadFailed(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::ProcessError(e) => write!(f, "Provider process error: {}", e),
            ProviderError::IoError(e) => write!(f, "I/O error: {}", e),
            ProviderError::InvalidResponse(e) => write!(f, "Invalid provider response: {}", e),
            ProviderError::DownloadFailed(e) => write!(f, "Download failed: {}", e),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ProviderError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProviderError {
    fn from(e: io::Error) -> Self {
        ProviderError::IoError(e)
    }
}
