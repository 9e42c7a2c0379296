//! Playback history tracking
//!
//! Maintains a bounded history of played tracks for "previous" navigation in
//! shuffle mode.

use std::collections::VecDeque;
use tune_core::TrackId;

/// Playback history with bounded size
///
/// Ring buffer of track ids that automatically discards the oldest entries.
#[derive(Debug, Clone)]
pub struct History {
    /// History buffer (most recent = back)
    tracks: VecDeque<TrackId>,

    /// Maximum history size
    max_size: usize,
}

impl History {
    /// Create new history with specified maximum size
    pub fn new(max_size: usize) -> Self {
        Self {
            tracks: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add a track to history
    ///
    /// Consecutive duplicates are collapsed; if history is full, the oldest
    /// entry is discarded.
    pub fn push(&mut self, track_id: TrackId) {
        if self.max_size == 0 || self.tracks.back() == Some(&track_id) {
            return;
        }
        if self.tracks.len() >= self.max_size {
            self.tracks.pop_front();
        }
        self.tracks.push_back(track_id);
    }

    /// Most recent entry (without removing)
    pub fn peek(&self) -> Option<&TrackId> {
        self.tracks.back()
    }

    /// Pop the most recent entry
    pub fn pop(&mut self) -> Option<TrackId> {
        self.tracks.pop_back()
    }

    /// Iterate from most recent to oldest
    pub fn iter_recent(&self) -> impl Iterator<Item = &TrackId> {
        self.tracks.iter().rev()
    }

    /// Drop every entry for `track_id` (e.g. after it left the queue)
    pub fn forget(&mut self, track_id: &TrackId) {
        self.tracks.retain(|id| id != track_id);
    }

    /// Get number of entries
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if history is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50) // Default: 50 tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TrackId {
        TrackId::new(s)
    }

    #[test]
    fn pop_returns_most_recent_first() {
        let mut history = History::new(10);
        history.push(id("1"));
        history.push(id("2"));
        history.push(id("3"));

        assert_eq!(history.pop(), Some(id("3")));
        assert_eq!(history.pop(), Some(id("2")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_bounded() {
        let mut history = History::new(3); // Max 3 tracks
        for i in 1..=4 {
            history.push(id(&i.to_string()));
        }
        assert_eq!(history.len(), 3);

        // Oldest (1) should be gone
        let recent: Vec<&str> = history.iter_recent().map(|t| t.as_str()).collect();
        assert_eq!(recent, vec!["4", "3", "2"]);
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut history = History::new(10);
        history.push(id("1"));
        history.push(id("1"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.peek(), Some(&id("1")));
    }

    #[test]
    fn forget_removes_all_occurrences() {
        let mut history = History::new(10);
        history.push(id("1"));
        history.push(id("2"));
        history.push(id("1"));
        history.forget(&id("1"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.peek(), Some(&id("2")));
    }

    #[test]
    fn zero_capacity_keeps_nothing() {
        let mut history = History::new(0);
        history.push(id("1"));
        assert!(history.is_empty());
    }
}
