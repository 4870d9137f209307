//! Command-line interface implementation

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use crate::commands;
use crate::config::Settings;

/// Command-line arguments for r-playbot
#[derive(Parser, Debug)]
#[command(author, version, about = "Shared-session music bot", long_about = None)]
pub struct Args {
    /// Config file path
    #[arg(short, long, env = "PLAYBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "r_playbot=debug"
    #[arg(short, long, default_value = "info", env = "PLAYBOT_LOG")]
    pub log_level: String,

    /// Directory uploaded files are copied into
    #[arg(short, long, env = "PLAYBOT_SHARE_DIR")]
    pub share_dir: Option<PathBuf>,

    /// Highest volume users may set
    #[arg(short, long, env = "PLAYBOT_MAX_VOLUME")]
    pub max_volume: Option<u32>,

    /// Name used in channel announcements
    #[arg(short, long, default_value = "console", env = "PLAYBOT_NICKNAME")]
    pub nickname: String,
}

impl Args {
    /// Config file to load: the explicit one, or the default location.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Settings::default_path)
    }

    /// Applies command-line overrides on top of file settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(share_dir) = &self.share_dir {
            settings.share_dir = share_dir.clone();
        }
        if let Some(max_volume) = self.max_volume {
            settings.max_volume = max_volume;
        }
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli { args: Args::parse() }
    }

    /// Prints the greeting and the command list
    pub fn display_banner(&self, settings: &Settings) {
        println!("r-playbot ready. Type commands, Ctrl+D or Ctrl+C to quit.");
        println!("{}", commands::help_text(&settings.command_prefix));
        println!();
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
