use std::error::Error;
use std::io;

/// Error types for file-transfer operations.
#[derive(Debug)]
pub enum TransportError {
    IoError(io::Error),
    NotFound(String),
    Rejected(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::IoError(e) => write!(f, "I/O error: {}", e),
            TransportError::NotFound(s) => write!(f, "Not found: {}", s),
            TransportError::Rejected(s) => write!(f, "Rejected by server: {}", s),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransportError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::IoError(e)
    }
}
