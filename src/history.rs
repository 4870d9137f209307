//! Record of previously played tracks, most recent first.

use crate::provider::Track;
use std::collections::VecDeque;
use std::sync::Arc;

/// Number of history lines delivered per message.
pub const HISTORY_CHUNK_LINES: usize = 4;

/// Bounded history of played tracks. Position 0 is always the most recent entry.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Track>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        HistoryBuffer {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    /// Puts `track` at the front. An older entry with the same link is moved, not duplicated.
    pub fn record(&mut self, track: Track) {
        self.entries.retain(|existing| existing.link != track.link);
        self.entries.push_front(track);
        self.entries.truncate(self.capacity);
    }

    /// Looks up an entry by its 1-based display index (1 = most recent).
    pub fn get(&self, index: usize) -> Option<&Track> {
        index.checked_sub(1).and_then(|position| self.entries.get(position))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the current entries for delivery.
    pub fn recent(&self) -> RecentHistory {
        RecentHistory {
            entries: self.entries.iter().cloned().collect(),
        }
    }
}

/// Immutable snapshot of the history. Every call to [`RecentHistory::chunks`]
/// starts a fresh pass, lines are only formatted as they are pulled.
#[derive(Debug, Clone)]
pub struct RecentHistory {
    entries: Arc<[Track]>,
}

impl RecentHistory {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines of the form `"<index>. <title>"`, most recent first.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(position, track)| format!("{}. {}", position + 1, track.title))
    }

    /// Groups of at most [`HISTORY_CHUNK_LINES`] lines joined by newlines.
    pub fn chunks(&self) -> HistoryChunks<'_> {
        HistoryChunks {
            history: self,
            next_position: 0,
        }
    }
}

pub struct HistoryChunks<'a> {
    history: &'a RecentHistory,
    next_position: usize,
}

impl Iterator for HistoryChunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let total = self.history.entries.len();
        if self.next_position >= total {
            return None;
        }
        let end = (self.next_position + HISTORY_CHUNK_LINES).min(total);
        let chunk = self.history.entries[self.next_position..end]
            .iter()
            .enumerate()
            .map(|(offset, track)| format!("{}. {}", self.next_position + offset + 1, track.title))
            .collect::<Vec<_>>()
            .join("\n");
        self.next_position = end;
        Some(chunk)
    }
}
