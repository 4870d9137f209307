use crate::history::{HistoryBuffer, RecentHistory};
use crate::lock_unpoisoned as lock;
use crate::provider::Track;
use std::sync::Mutex;
use tokio::sync::{Mutex as TokioMutex, MutexGuard as TokioMutexGuard};

/// Where the session stands with respect to coordinator-initiated track switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchPhase {
    /// Nothing loaded.
    Idle,
    /// An explicit switch is between stopping the old track and confirming the new one.
    Transitioning,
    /// A track is loaded.
    Steady,
}

/// Direction of a search-result navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Next,
    Previous,
}

/// Why a navigation step was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRefusal {
    NoResults,
    EndOfResults,
    StartOfResults,
}

/// Copy of the session for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub current_link: Option<String>,
    pub search_results: Vec<Track>,
    pub current_search_index: usize,
    pub phase: SwitchPhase,
}

#[derive(Debug)]
struct SessionState {
    current_link: Option<String>,
    search_results: Vec<Track>,
    current_search_index: usize,
    phase: SwitchPhase,
    history: HistoryBuffer,
}

/// The single shared playback session.
///
/// Plain state sits behind a short-lived mutex that is never held across an
/// await. Every stop/load sequence additionally holds `switch_lock`, so at
/// most one track is loading at a time and navigation steps never interleave.
#[derive(Debug)]
pub struct PlaybackSession {
    state: Mutex<SessionState>,
    switch_lock: TokioMutex<()>,
}

impl PlaybackSession {
    pub fn new(history_capacity: usize) -> Self {
        PlaybackSession {
            state: Mutex::new(SessionState {
                current_link: None,
                search_results: Vec::new(),
                current_search_index: 0,
                phase: SwitchPhase::Idle,
                history: HistoryBuffer::new(history_capacity),
            }),
            switch_lock: TokioMutex::new(()),
        }
    }

    /// Serializes load/stop/switch sequences.
    pub async fn lock_switch(&self) -> TokioMutexGuard<'_, ()> {
        self.switch_lock.lock().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = lock(&self.state);
        SessionSnapshot {
            current_link: state.current_link.clone(),
            search_results: state.search_results.clone(),
            current_search_index: state.current_search_index,
            phase: state.phase,
        }
    }

    pub fn current_link(&self) -> Option<String> {
        lock(&self.state).current_link.clone()
    }

    pub fn phase(&self) -> SwitchPhase {
        lock(&self.state).phase
    }

    /// Replaces the search results and points at the first one.
    pub fn replace_results(&self, results: Vec<Track>) {
        let mut state = lock(&self.state);
        state.search_results = results;
        state.current_search_index = 0;
    }

    /// Checks whether `step` is possible and returns the target index and track without moving.
    pub fn peek_step(&self, step: Step) -> Result<(usize, Track), StepRefusal> {
        let state = lock(&self.state);
        if state.search_results.is_empty() {
            return Err(StepRefusal::NoResults);
        }
        let index = state.current_search_index;
        let target = match step {
            Step::Next if index + 1 < state.search_results.len() => index + 1,
            Step::Next => return Err(StepRefusal::EndOfResults),
            Step::Previous if index > 0 => index - 1,
            Step::Previous => return Err(StepRefusal::StartOfResults),
        };
        Ok((target, state.search_results[target].clone()))
    }

    /// Moves the navigation position to `index`. Out-of-range indices are ignored.
    pub fn commit_index(&self, index: usize) {
        let mut state = lock(&self.state);
        if index < state.search_results.len() {
            state.current_search_index = index;
        }
    }

    /// Enters the switch window in which end-of-track notifications are ignored.
    pub fn begin_switch(&self) {
        lock(&self.state).phase = SwitchPhase::Transitioning;
    }

    /// Records a confirmed load and leaves any switch window.
    pub fn finish_load(&self, track: Track) {
        let mut state = lock(&self.state);
        state.current_link = Some(track.link.clone());
        state.phase = SwitchPhase::Steady;
        state.history.record(track);
    }

    /// Records a failed load. The session falls back to idle.
    pub fn fail_load(&self) {
        let mut state = lock(&self.state);
        state.current_link = None;
        state.phase = SwitchPhase::Idle;
    }

    /// Clears everything a stop discards. History is kept.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        state.current_link = None;
        state.search_results.clear();
        state.current_search_index = 0;
        state.phase = SwitchPhase::Idle;
    }

    /// Runs `on_end` if the session is not inside a switch window, returning whether it ran.
    /// The phase check and `on_end` happen under the same lock as `begin_switch`.
    pub fn end_of_track(&self, on_end: impl FnOnce()) -> bool {
        let mut state = lock(&self.state);
        if state.phase == SwitchPhase::Transitioning {
            return false;
        }
        state.phase = SwitchPhase::Idle;
        on_end();
        true
    }

    pub fn history_entry(&self, index: usize) -> Option<Track> {
        lock(&self.state).history.get(index).cloned()
    }

    pub fn recent_history(&self) -> RecentHistory {
        lock(&self.state).history.recent()
    }
}
