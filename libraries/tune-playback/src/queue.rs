//! Queue management
//!
//! Ordered, de-duplicated list of tracks with a current index, shuffle flag
//! and repeat mode.
//!
//! Invariants:
//! - the current index is `None` or `< len()` (and `None` only when empty)
//! - no two entries share a track id
//!
//! Navigation is split into pure lookahead (`peek_next`, `peek_previous`) and
//! mutating steps (`advance_next`, `advance_previous`). Out-of-range
//! arguments are silent no-ops.

use crate::history::History;
use crate::shuffle::{pick_next, shuffle_keep_current, ShufflePick};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tune_core::{RepeatMode, Track, TrackId};

/// Persisted form of the queue. Playing/paused is deliberately absent:
/// a restored queue always starts paused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub tracks: Vec<Track>,
    pub current_index: Option<usize>,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub repeat: RepeatMode,
}

/// Playback queue
#[derive(Debug, Clone)]
pub struct Queue {
    tracks: Vec<Track>,
    current: Option<usize>,
    shuffle: bool,
    repeat: RepeatMode,

    /// Tracks played in the current shuffle cycle
    played: HashSet<TrackId>,
    /// Cached shuffle draw so peek and advance agree
    shuffle_pick: Option<ShufflePick>,
    history: History,
    rng: StdRng,
}

impl Queue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty queue with a deterministic shuffle sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tracks: Vec::new(),
            current: None,
            shuffle: false,
            repeat: RepeatMode::Off,
            played: HashSet::new(),
            shuffle_pick: None,
            history: History::default(),
            rng,
        }
    }

    // ===== Mutation =====

    /// Replace the queue. Duplicates are dropped (first occurrence wins).
    pub fn set_queue(&mut self, tracks: Vec<Track>) {
        self.tracks = dedup(tracks);
        self.current = if self.tracks.is_empty() { None } else { Some(0) };
        self.history.clear();
        self.start_cycle();
        self.refresh_pick();
    }

    /// Append tracks whose id is not already queued. Returns how many were added.
    pub fn add_to_queue(&mut self, tracks: Vec<Track>) -> usize {
        let was_empty = self.tracks.is_empty();
        let mut seen: HashSet<TrackId> = self.tracks.iter().map(|t| t.id.clone()).collect();

        let before = self.tracks.len();
        for track in tracks {
            if seen.insert(track.id.clone()) {
                self.tracks.push(track);
            }
        }
        let added = self.tracks.len() - before;

        if was_empty && added > 0 {
            self.current = Some(0);
            self.start_cycle();
        }
        self.refresh_pick();
        added
    }

    /// Remove the track at `index`. Out of bounds is a no-op.
    pub fn remove_from_queue(&mut self, index: usize) -> Option<Track> {
        if index >= self.tracks.len() {
            return None;
        }

        let removed = self.tracks.remove(index);
        self.played.remove(&removed.id);
        self.history.forget(&removed.id);

        self.current = match self.current {
            _ if self.tracks.is_empty() => None,
            Some(cur) if index < cur => Some(cur - 1),
            Some(cur) if index == cur => Some(cur.min(self.tracks.len() - 1)),
            other => other,
        };
        if let Some(cur) = self.current {
            self.played.insert(self.tracks[cur].id.clone());
        }
        self.refresh_pick();
        Some(removed)
    }

    /// Remove every track
    pub fn clear_queue(&mut self) {
        self.tracks.clear();
        self.current = None;
        self.played.clear();
        self.history.clear();
        self.shuffle_pick = None;
    }

    /// Jump to `index`. Returns `false` if out of bounds or already current.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index >= self.tracks.len() || self.current == Some(index) {
            return false;
        }
        self.move_to(index);
        self.refresh_pick();
        true
    }

    /// Move a track, keeping the current index on the same logical track
    pub fn move_queue_item(&mut self, from: usize, to: usize) -> bool {
        let len = self.tracks.len();
        if from >= len || to >= len || from == to {
            return false;
        }

        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);

        self.current = self.current.map(|cur| {
            if cur == from {
                to
            } else if from < cur && to >= cur {
                cur - 1
            } else if from > cur && to <= cur {
                cur + 1
            } else {
                cur
            }
        });
        self.refresh_pick();
        true
    }

    /// Fisher-Yates permutation with the current track moved to the front
    pub fn shuffle_queue(&mut self) {
        if self.tracks.len() <= 1 {
            return;
        }
        self.current = shuffle_keep_current(&mut self.tracks, self.current, &mut self.rng);
        self.start_cycle();
        self.refresh_pick();
    }

    /// Enable or disable shuffle mode
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle == enabled {
            return;
        }
        self.shuffle = enabled;
        self.start_cycle();
        self.refresh_pick();
    }

    /// Set repeat mode
    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
        self.refresh_pick();
    }

    // ===== Navigation =====

    /// Index `advance_next` would move to, without moving
    pub fn peek_next(&self) -> Option<usize> {
        self.next_index(self.repeat)
    }

    /// Index `advance_previous` would move to, without moving
    pub fn peek_previous(&self) -> Option<usize> {
        let cur = self.current?;
        if self.repeat == RepeatMode::One {
            return Some(cur);
        }
        if self.shuffle {
            if let Some(index) = self
                .history
                .iter_recent()
                .filter_map(|id| self.position_of(id))
                .find(|&i| i != cur)
            {
                return Some(index);
            }
        }
        self.sequential_previous(cur)
    }

    /// Step forward. `None` (index unchanged) at the end of the queue.
    ///
    /// With repeat one the current track is returned again.
    pub fn advance_next(&mut self) -> Option<&Track> {
        let index = self.peek_next()?;
        self.step_forward(index);
        self.tracks.get(index)
    }

    /// Step forward after the current track failed to load.
    ///
    /// Same as [`Self::advance_next`] except repeat one behaves like repeat
    /// all, so a broken track is not retried in place.
    pub fn advance_after_failure(&mut self) -> Option<&Track> {
        let repeat = match self.repeat {
            RepeatMode::One => RepeatMode::All,
            other => other,
        };
        let index = self.next_index(repeat)?;
        if Some(index) == self.current {
            return None;
        }
        self.step_forward(index);
        self.tracks.get(index)
    }

    /// Step backward. `None` (index unchanged) at the start of the queue.
    pub fn advance_previous(&mut self) -> Option<&Track> {
        let index = self.peek_previous()?;
        if Some(index) != self.current {
            if self.shuffle {
                // Consume history up to and including the entry we jump to
                let target = self.tracks[index].id.clone();
                while let Some(id) = self.history.pop() {
                    if id == target {
                        break;
                    }
                }
            }
            self.current = Some(index);
            self.played.insert(self.tracks[index].id.clone());
            self.refresh_pick();
        }
        self.tracks.get(index)
    }

    // ===== Accessors =====

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// Index of the track with `id`
    pub fn position_of(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| &t.id == id)
    }

    /// Whether the current track is the last queue entry
    pub fn is_at_last(&self) -> bool {
        matches!(self.current, Some(cur) if cur + 1 == self.tracks.len())
    }

    // ===== Persistence =====

    /// Persistable view of the queue
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            tracks: self.tracks.clone(),
            current_index: self.current,
            shuffle: self.shuffle,
            repeat: self.repeat,
        }
    }

    /// Restore a snapshot, re-validating its invariants
    pub fn restore(&mut self, snapshot: QueueSnapshot) {
        self.tracks = dedup(snapshot.tracks);
        self.current = match snapshot.current_index {
            Some(i) if i < self.tracks.len() => Some(i),
            _ if self.tracks.is_empty() => None,
            _ => Some(0),
        };
        self.shuffle = snapshot.shuffle;
        self.repeat = snapshot.repeat;
        self.history.clear();
        self.start_cycle();
        self.refresh_pick();
    }

    // ===== Internals =====

    fn next_index(&self, repeat: RepeatMode) -> Option<usize> {
        let cur = self.current?;
        if repeat == RepeatMode::One {
            return Some(cur);
        }
        if self.shuffle {
            return match (repeat, self.shuffle_pick) {
                (_, Some(pick)) if !pick.new_cycle || repeat == RepeatMode::All => Some(pick.index),
                // A lone track under repeat all replays itself
                (RepeatMode::All, None) if self.tracks.len() == 1 => Some(cur),
                _ => None,
            };
        }
        if cur + 1 < self.tracks.len() {
            Some(cur + 1)
        } else if repeat == RepeatMode::All {
            Some(0)
        } else {
            None
        }
    }

    fn sequential_previous(&self, cur: usize) -> Option<usize> {
        if cur > 0 {
            Some(cur - 1)
        } else if self.repeat == RepeatMode::All {
            Some(self.tracks.len() - 1)
        } else {
            None
        }
    }

    fn step_forward(&mut self, index: usize) {
        let new_cycle = self.shuffle
            && self
                .shuffle_pick
                .is_some_and(|pick| pick.index == index && pick.new_cycle);
        self.move_to(index);
        if new_cycle {
            self.start_cycle();
        }
        self.refresh_pick();
    }

    fn move_to(&mut self, index: usize) {
        if let Some(cur) = self.current.filter(|&c| c != index) {
            if let Some(track) = self.tracks.get(cur) {
                self.history.push(track.id.clone());
                self.played.insert(track.id.clone());
            }
        }
        self.current = Some(index);
        self.played.insert(self.tracks[index].id.clone());
    }

    fn start_cycle(&mut self) {
        self.played.clear();
        if let Some(track) = self.current_track() {
            let id = track.id.clone();
            self.played.insert(id);
        }
    }

    fn refresh_pick(&mut self) {
        self.shuffle_pick = match self.current {
            Some(cur) if self.shuffle => pick_next(
                &self.tracks,
                cur,
                &self.played,
                // Draw a wrap-around pick regardless; next_index filters it by repeat mode
                true,
                &mut self.rng,
            ),
            _ => None,
        };
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

fn dedup(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|t| seen.insert(t.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| Track::new(*id, format!("Track {id}"))).collect()
    }

    fn queue_of(ids: &[&str]) -> Queue {
        let mut queue = Queue::with_seed(11);
        queue.set_queue(tracks(ids));
        queue
    }

    fn current_id(queue: &Queue) -> &str {
        queue.current_track().unwrap().id.as_str()
    }

    #[test]
    fn set_queue_dedups_and_selects_first() {
        let queue = queue_of(&["a", "b", "a", "c"]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.current_index(), Some(0));

        let mut empty = Queue::with_seed(1);
        empty.set_queue(Vec::new());
        assert_eq!(empty.current_index(), None);
    }

    #[test]
    fn add_skips_existing_ids() {
        let mut queue = queue_of(&["a", "b"]);
        let added = queue.add_to_queue(tracks(&["b", "c", "c"]));
        assert_eq!(added, 1);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn add_to_empty_queue_selects_first() {
        let mut queue = Queue::with_seed(1);
        queue.add_to_queue(tracks(&["x"]));
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn removal_before_current_shifts_index() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.set_current_index(2);
        queue.remove_from_queue(0);
        assert_eq!(queue.current_index(), Some(1));
        assert_eq!(current_id(&queue), "c");
    }

    #[test]
    fn removing_last_current_clamps() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current_index(2);
        queue.remove_from_queue(2);
        assert_eq!(queue.current_index(), Some(1));

        let mut single = queue_of(&["a"]);
        single.remove_from_queue(0);
        assert_eq!(single.current_index(), None);
    }

    #[test]
    fn removal_out_of_bounds_is_noop() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.remove_from_queue(5).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn set_current_index_idempotent() {
        let mut queue = queue_of(&["a", "b"]);
        assert!(queue.set_current_index(1));
        assert!(!queue.set_current_index(1));
        assert!(!queue.set_current_index(9));
        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn repeat_one_returns_same_track() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current_index(1);
        queue.set_repeat(RepeatMode::One);

        assert_eq!(queue.peek_next(), Some(1));
        assert_eq!(queue.advance_next().unwrap().id.as_str(), "b");
        assert_eq!(queue.advance_previous().unwrap().id.as_str(), "b");
        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn repeat_all_wraps_both_ways() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_repeat(RepeatMode::All);
        queue.set_current_index(2);

        assert_eq!(queue.advance_next().unwrap().id.as_str(), "a");
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(queue.advance_previous().unwrap().id.as_str(), "c");
    }

    #[test]
    fn no_repeat_end_of_queue() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current_index(2);
        assert!(queue.advance_next().is_none());
        assert_eq!(queue.current_index(), Some(2));

        queue.set_current_index(0);
        assert!(queue.advance_previous().is_none());
        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn peek_does_not_mutate() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_shuffle(true);
        let first = queue.peek_next();
        assert_eq!(queue.peek_next(), first);
        assert_eq!(queue.current_index(), Some(0));
        let expected = queue.tracks()[first.unwrap()].id.clone();
        assert_eq!(queue.advance_next().unwrap().id, expected);
    }

    #[test]
    fn shuffle_cycle_plays_every_track_once() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut queue = queue_of(&ids);
        queue.set_shuffle(true);

        let mut seen = HashSet::new();
        seen.insert(current_id(&queue).to_string());
        while let Some(track) = queue.advance_next() {
            assert!(seen.insert(track.id.as_str().to_string()), "repeated {}", track.id);
        }
        assert_eq!(seen.len(), ids.len());
    }

    #[test]
    fn shuffle_with_repeat_all_starts_new_cycle() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_shuffle(true);
        queue.set_repeat(RepeatMode::All);

        for _ in 0..20 {
            let before = queue.current_index();
            assert!(queue.advance_next().is_some());
            assert_ne!(queue.current_index(), before);
        }
    }

    #[test]
    fn shuffle_previous_walks_history() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e"]);
        queue.set_shuffle(true);

        let mut visited = vec![current_id(&queue).to_string()];
        for _ in 0..3 {
            visited.push(queue.advance_next().unwrap().id.as_str().to_string());
        }

        for expected in visited.iter().rev().skip(1) {
            assert_eq!(queue.advance_previous().unwrap().id.as_str(), expected);
        }
    }

    #[test]
    fn move_item_tracks_current() {
        let mut queue = queue_of(&["a", "b", "c", "d"]);
        queue.set_current_index(1); // b

        queue.move_queue_item(0, 3);
        assert_eq!(current_id(&queue), "b");
        assert_eq!(queue.current_index(), Some(0));

        queue.move_queue_item(0, 2);
        assert_eq!(current_id(&queue), "b");
        assert_eq!(queue.current_index(), Some(2));

        queue.move_queue_item(3, 0);
        assert_eq!(current_id(&queue), "b");
        assert_eq!(queue.current_index(), Some(3));
    }

    #[test]
    fn shuffle_queue_keeps_current_first() {
        let mut queue = queue_of(&["a", "b", "c", "d", "e"]);
        queue.set_current_index(3);
        queue.shuffle_queue();
        assert_eq!(queue.current_index(), Some(0));
        assert_eq!(current_id(&queue), "d");
        assert_eq!(queue.len(), 5);
    }

    #[test]
    fn failure_advance_skips_even_with_repeat_one() {
        let mut queue = queue_of(&["a", "b"]);
        queue.set_repeat(RepeatMode::One);
        assert_eq!(queue.advance_after_failure().unwrap().id.as_str(), "b");
        // Wraps like repeat all
        assert_eq!(queue.advance_after_failure().unwrap().id.as_str(), "a");

        let mut single = queue_of(&["a"]);
        single.set_repeat(RepeatMode::One);
        assert!(single.advance_after_failure().is_none());
    }

    #[test]
    fn snapshot_restore_validates() {
        let mut queue = queue_of(&["a", "b", "c"]);
        queue.set_current_index(2);
        queue.set_repeat(RepeatMode::All);
        let snapshot = queue.snapshot();

        let mut restored = Queue::with_seed(5);
        restored.restore(snapshot);
        assert_eq!(restored.current_index(), Some(2));
        assert_eq!(restored.repeat(), RepeatMode::All);

        let mut broken = QueueSnapshot {
            tracks: tracks(&["a", "a", "b"]),
            current_index: Some(7),
            ..Default::default()
        };
        restored.restore(broken.clone());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.current_index(), Some(0));

        broken.tracks.clear();
        restored.restore(broken);
        assert_eq!(restored.current_index(), None);
    }

    #[test]
    fn empty_queue_navigation_is_none() {
        let mut queue = Queue::with_seed(1);
        queue.set_shuffle(true);
        assert_eq!(queue.peek_next(), None);
        assert!(queue.advance_next().is_none());
        assert!(queue.advance_previous().is_none());
    }
}
