//! Search/download provider contract

mod error;
pub mod ytdlp;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use error::ProviderError;
pub use ytdlp::YtDlpProvider;

/// A candidate track returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub link: String,
}

impl Track {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Track {
            title: title.into(),
            link: link.into(),
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Resolves a free-text query to candidates, best match first.
    async fn search(&self, query: &str) -> Result<Vec<Track>, ProviderError>;

    /// Downloads the best audio encoding of `link` into `output_dir` and
    /// returns the path of the written file (`<title>.<ext>`).
    async fn fetch_audio(&self, link: &str, output_dir: &Path) -> Result<PathBuf, ProviderError>;
}
