//! Bot settings and configuration management

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bot settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Highest volume a user may request
    #[serde(default = "default_max_volume")]
    pub max_volume: u32,
    /// Volume applied to the engine at startup
    #[serde(default = "default_volume")]
    pub default_volume: u32,
    /// Seek step in seconds used when `+`/`-` carry no valid amount
    #[serde(default = "default_seek_step")]
    pub seek_step: i64,
    /// Minutes before an uploaded download is deleted again (0 keeps it)
    #[serde(default)]
    pub deletion_delay_minutes: u64,
    /// Status text shown while nothing is playing
    #[serde(default)]
    pub status_message: String,
    /// Local working directory for downloaded audio
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Number of background tasks allowed to run at once
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Number of played tracks kept in the history buffer
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Number of candidates requested from the search provider
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,
    /// Cookie file handed to the provider, if any
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
    /// Token that starts a command line
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    /// Directory the console transport uploads into
    #[serde(default = "default_share_dir")]
    pub share_dir: PathBuf,
    /// mpv executable used by the media engine
    #[serde(default = "default_mpv_path")]
    pub mpv_path: String,
    /// yt-dlp executable used by the search provider
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
}

fn default_max_volume() -> u32 {
    100
}

fn default_volume() -> u32 {
    50
}

fn default_seek_step() -> i64 {
    5
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_worker_threads() -> usize {
    4
}

fn default_history_capacity() -> usize {
    50
}

fn default_search_result_limit() -> usize {
    10
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_share_dir() -> PathBuf {
    PathBuf::from("shared")
}

fn default_mpv_path() -> String {
    "mpv".to_string()
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_volume: default_max_volume(),
            default_volume: default_volume(),
            seek_step: default_seek_step(),
            deletion_delay_minutes: 0,
            status_message: String::new(),
            download_dir: default_download_dir(),
            worker_threads: default_worker_threads(),
            history_capacity: default_history_capacity(),
            search_result_limit: default_search_result_limit(),
            cookie_file: None,
            command_prefix: default_command_prefix(),
            share_dir: default_share_dir(),
            mpv_path: default_mpv_path(),
            ytdlp_path: default_ytdlp_path(),
        }
    }
}

impl Settings {
    /// Load settings from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("playbot").join("config.json")
    }

    /// Delay before an uploaded file is cleaned up, `None` when cleanup is disabled.
    pub fn deletion_delay(&self) -> Option<Duration> {
        if self.deletion_delay_minutes == 0 {
            None
        } else {
            Some(Duration::from_secs(self.deletion_delay_minutes * 60))
        }
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_volume == 0 {
            return Err(ConfigError::ValidationError("max_volume must be greater than zero".to_string()));
        }

        if self.default_volume > self.max_volume {
            return Err(ConfigError::ValidationError(format!(
                "default_volume {} exceeds max_volume {}",
                self.default_volume, self.max_volume
            )));
        }

        if self.seek_step <= 0 {
            return Err(ConfigError::ValidationError("seek_step must be positive".to_string()));
        }

        if self.worker_threads == 0 {
            return Err(ConfigError::ValidationError("worker_threads must be at least 1".to_string()));
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::ValidationError("history_capacity must be at least 1".to_string()));
        }

        if self.command_prefix.is_empty() {
            return Err(ConfigError::ValidationError("command_prefix cannot be empty".to_string()));
        }

        Ok(())
    }
}
