//! Provider backed by the `yt-dlp` command-line tool.

use super::{ProviderError, SearchProvider, Track};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

const LOG_TARGET: &str = "r_playbot::provider::ytdlp";
const AUDIO_FORMAT: &str = "bestaudio[ext=m4a]/bestaudio/best";
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// One line of `--dump-json` output for a flat search.
#[derive(Debug, Deserialize)]
struct SearchEntry {
    title: Option<String>,
    id: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

impl SearchEntry {
    fn into_track(self) -> Option<Track> {
        let link = self
            .webpage_url
            .or(self.url)
            .or_else(|| self.id.map(|id| format!("https://www.youtube.com/watch?v={}", id)))?;
        let title = self.title.unwrap_or_else(|| link.clone());
        Some(Track { title, link })
    }
}

pub struct YtDlpProvider {
    program: String,
    result_limit: usize,
    cookie_file: Option<PathBuf>,
}

impl YtDlpProvider {
    pub fn new(program: impl Into<String>, result_limit: usize) -> Self {
        YtDlpProvider {
            program: program.into(),
            result_limit: result_limit.max(1),
            cookie_file: None,
        }
    }

    /// Passes a cookie file to every invocation.
    pub fn with_cookie_file(mut self, cookie_file: Option<PathBuf>) -> Self {
        self.cookie_file = cookie_file;
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("--no-warnings");
        if let Some(cookies) = &self.cookie_file {
            command.arg("--cookies").arg(cookies);
        }
        command
    }

    async fn run(&self, mut command: Command) -> Result<Output, ProviderError> {
        let output = command
            .output()
            .await
            .map_err(|e| ProviderError::ProcessError(format!("failed to run {}: {}", self.program, e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ProviderError::ProcessError(format!("{} exited with {}: {}", self.program, output.status, stderr)));
        }
        Ok(output)
    }
}

/// Parses `--dump-json` output, one JSON object per line.
pub(super) fn parse_search_output(stdout: &str) -> Vec<Track> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<SearchEntry>(line) {
            Ok(entry) => entry.into_track(),
            Err(e) => {
                warn!(target: LOG_TARGET, "Skipping unparsable search entry: {}", e);
                None
            }
        })
        .collect()
}

/// Picks the final file path printed by `--print after_move:filepath`.
pub(super) fn parse_download_output(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
}

#[async_trait]
impl SearchProvider for YtDlpProvider {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Track>, ProviderError> {
        let mut command = self.command();
        command
            .arg("--flat-playlist")
            .arg("--dump-json")
            .arg(format!("ytsearch{}:{}", self.result_limit, query));

        let output = self.run(command).await?;
        let tracks = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        info!(target: LOG_TARGET, "Search for '{}' returned {} results.", query, tracks.len());
        Ok(tracks)
    }

    #[instrument(skip(self, output_dir), fields(output_dir = %output_dir.display()))]
    async fn fetch_audio(&self, link: &str, output_dir: &Path) -> Result<PathBuf, ProviderError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let mut command = self.command();
        command
            .arg("--no-playlist")
            .arg("-f")
            .arg(AUDIO_FORMAT)
            .arg("-o")
            .arg(output_dir.join(OUTPUT_TEMPLATE))
            .arg("--no-simulate")
            .arg("--print")
            .arg("after_move:filepath")
            .arg(link);

        let output = self.run(command).await?;
        let path = parse_download_output(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| ProviderError::InvalidResponse("yt-dlp did not report an output file".to_string()))?;
        if !path.exists() {
            return Err(ProviderError::DownloadFailed(format!("{} was reported but not written", path.display())));
        }

        debug!(target: LOG_TARGET, "Downloaded {} to {}", link, path.display());
        Ok(path)
    }
}
