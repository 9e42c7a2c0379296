//! Shuffle algorithms for queue randomization
//!
//! - [`shuffle_keep_current`]: Fisher-Yates over the whole queue with the
//!   current track pinned to the front
//! - [`pick_next`]: the per-step draw used while shuffle mode is on

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tune_core::{Track, TrackId};

/// Outcome of a shuffle-mode draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShufflePick {
    /// Queue index to play next
    pub index: usize,
    /// Whether the draw started a new cycle (all tracks had been played)
    pub new_cycle: bool,
}

/// Permute `tracks` in place, placing the track at `current` first.
///
/// Returns the new current index (`Some(0)` when there was a current track).
pub fn shuffle_keep_current<R: Rng + ?Sized>(
    tracks: &mut Vec<Track>,
    current: Option<usize>,
    rng: &mut R,
) -> Option<usize> {
    match current.filter(|&i| i < tracks.len()) {
        Some(index) => {
            let pinned = tracks.remove(index);
            tracks.shuffle(rng);
            tracks.insert(0, pinned);
            Some(0)
        }
        None => {
            tracks.shuffle(rng);
            None
        }
    }
}

/// Draw the next index uniformly among tracks not yet played this cycle.
///
/// The current index is never drawn. When every other track has been played,
/// `wrap` decides between starting a new cycle and reporting the end.
pub fn pick_next<R: Rng + ?Sized>(
    tracks: &[Track],
    current: usize,
    played: &HashSet<TrackId>,
    wrap: bool,
    rng: &mut R,
) -> Option<ShufflePick> {
    let unplayed: Vec<usize> = (0..tracks.len())
        .filter(|&i| i != current && !played.contains(&tracks[i].id))
        .collect();

    if let Some(&index) = unplayed.choose(rng) {
        return Some(ShufflePick {
            index,
            new_cycle: false,
        });
    }

    if !wrap {
        return None;
    }

    let others: Vec<usize> = (0..tracks.len()).filter(|&i| i != current).collect();
    others.choose(rng).map(|&index| ShufflePick {
        index,
        new_cycle: true,
    })
}
