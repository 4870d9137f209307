//! Media engine contract consumed by the coordinator

mod error;
pub mod mpv;

use async_trait::async_trait;
use std::sync::Arc;

pub use error::EngineError;
pub use mpv::MpvEngine;

/// Callback fired when a track ends on its own (end of stream, load error, engine exit).
pub type EndOfTrackCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Direction of a relative seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Back,
}

/// Snapshot of what the engine reports about the loaded track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStatus {
    pub is_playing: bool,
    pub paused: bool,
    pub media_title: String,
    pub duration: Option<f64>,
    pub playback_time: Option<f64>,
    pub volume: u32,
}

#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Loads `link` and starts streaming it.
    /// Resolves once the engine confirms the track is loaded.
    async fn play_stream(&self, link: &str) -> Result<(), EngineError>;

    async fn pause_stream(&self) -> Result<(), EngineError>;

    async fn resume_stream(&self) -> Result<(), EngineError>;

    async fn stop(&self) -> Result<(), EngineError>;

    async fn seek(&self, direction: SeekDirection, seconds: i64) -> Result<(), EngineError>;

    async fn set_volume(&self, volume: u32) -> Result<(), EngineError>;

    /// Latest reported state. Never blocks.
    fn status(&self) -> EngineStatus;

    /// Registers the single end-of-track notification, replacing any earlier one.
    fn set_end_of_track_callback(&self, callback: EndOfTrackCallback);
}

/// Formats a number of seconds as `M:SS`, or `H:MM:SS` from one hour up.
/// Negative and non-finite inputs are shown as zero.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
