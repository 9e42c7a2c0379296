//! Property-based tests for the playback queue
//!
//! Random operation sequences must never break the queue's structural
//! invariants.

use proptest::prelude::*;
use std::collections::HashSet;
use tune_core::{DownloadVariant, RepeatMode, Track};
use tune_playback::Queue;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum Op {
    SetQueue(Vec<u8>),
    Add(Vec<u8>),
    Remove(usize),
    Move(usize, usize),
    Select(usize),
    Next,
    Previous,
    AfterFailure,
    Shuffle(bool),
    Repeat(RepeatMode),
    ShuffleQueue,
    Clear,
}

fn track(n: u8) -> Track {
    Track::new(format!("t{n}"), format!("Song {n}"))
        .with_download(DownloadVariant::new("320kbps", format!("https://cdn.example.com/{n}.mp4")))
}

fn ids() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..20, 0..12)
}

fn arbitrary_repeat() -> impl Strategy<Value = RepeatMode> {
    prop_oneof![Just(RepeatMode::Off), Just(RepeatMode::All), Just(RepeatMode::One)]
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        ids().prop_map(Op::SetQueue),
        ids().prop_map(Op::Add),
        (0usize..15).prop_map(Op::Remove),
        (0usize..15, 0usize..15).prop_map(|(a, b)| Op::Move(a, b)),
        (0usize..15).prop_map(Op::Select),
        Just(Op::Next),
        Just(Op::Next),
        Just(Op::Previous),
        Just(Op::AfterFailure),
        any::<bool>().prop_map(Op::Shuffle),
        arbitrary_repeat().prop_map(Op::Repeat),
        Just(Op::ShuffleQueue),
        Just(Op::Clear),
    ]
}

fn apply(queue: &mut Queue, op: &Op) {
    match op {
        Op::SetQueue(ids) => queue.set_queue(ids.iter().map(|&n| track(n)).collect()),
        Op::Add(ids) => {
            queue.add_to_queue(ids.iter().map(|&n| track(n)).collect());
        }
        Op::Remove(i) => {
            queue.remove_from_queue(*i);
        }
        Op::Move(from, to) => {
            queue.move_queue_item(*from, *to);
        }
        Op::Select(i) => {
            queue.set_current_index(*i);
        }
        Op::Next => {
            queue.advance_next();
        }
        Op::Previous => {
            queue.advance_previous();
        }
        Op::AfterFailure => {
            queue.advance_after_failure();
        }
        Op::Shuffle(on) => queue.set_shuffle(*on),
        Op::Repeat(mode) => queue.set_repeat(*mode),
        Op::ShuffleQueue => queue.shuffle_queue(),
        Op::Clear => queue.clear_queue(),
    }
}

fn check_invariants(queue: &Queue) -> Result<(), TestCaseError> {
    match queue.current_index() {
        Some(i) => prop_assert!(i < queue.len(), "index {} out of bounds for {}", i, queue.len()),
        None => prop_assert!(queue.is_empty(), "non-empty queue without a current track"),
    }

    let unique: HashSet<_> = queue.tracks().iter().map(|t| &t.id).collect();
    prop_assert_eq!(unique.len(), queue.len(), "duplicate track ids");

    if let Some(next) = queue.peek_next() {
        prop_assert!(next < queue.len());
    }
    if let Some(previous) = queue.peek_previous() {
        prop_assert!(previous < queue.len());
    }
    Ok(())
}

// ===== Property Tests =====

proptest! {
    /// Property: the current index is always in bounds and ids stay unique
    #[test]
    fn invariants_hold_after_any_operations(
        seed in any::<u64>(),
        ops in prop::collection::vec(arbitrary_op(), 1..40)
    ) {
        let mut queue = Queue::with_seed(seed);
        for op in &ops {
            apply(&mut queue, op);
            check_invariants(&queue)?;
        }
    }

    /// Property: peeking never changes the queue
    #[test]
    fn peek_is_pure(
        seed in any::<u64>(),
        ops in prop::collection::vec(arbitrary_op(), 1..20)
    ) {
        let mut queue = Queue::with_seed(seed);
        for op in &ops {
            apply(&mut queue, op);
        }

        let before = queue.snapshot();
        let next = queue.peek_next();
        let previous = queue.peek_previous();

        prop_assert_eq!(queue.peek_next(), next);
        prop_assert_eq!(queue.peek_previous(), previous);
        prop_assert_eq!(queue.snapshot(), before);
    }

    /// Property: advancing lands exactly where peeking said it would
    #[test]
    fn advance_matches_peek(
        seed in any::<u64>(),
        ops in prop::collection::vec(arbitrary_op(), 1..20)
    ) {
        let mut queue = Queue::with_seed(seed);
        for op in &ops {
            apply(&mut queue, op);
        }

        let expected = queue.peek_next();
        let before = queue.current_index();
        queue.advance_next();
        match expected {
            Some(index) => prop_assert_eq!(queue.current_index(), Some(index)),
            None => prop_assert_eq!(queue.current_index(), before),
        }
    }

    /// Property: repeat one pins both directions to the current track
    #[test]
    fn repeat_one_law(
        ids in prop::collection::vec(0u8..20, 1..12),
        index in 0usize..12,
        shuffle in any::<bool>()
    ) {
        let mut queue = Queue::with_seed(7);
        queue.set_queue(ids.iter().map(|&n| track(n)).collect());
        queue.set_current_index(index % queue.len());
        queue.set_shuffle(shuffle);
        queue.set_repeat(RepeatMode::One);

        let current = queue.current_index();
        prop_assert_eq!(queue.peek_next(), current);
        prop_assert_eq!(queue.peek_previous(), current);
    }

    /// Property: a shuffled cycle visits every track once before repeating
    #[test]
    fn shuffle_cycle_visits_every_track(
        n in 2u8..15,
        seed in any::<u64>()
    ) {
        let mut queue = Queue::with_seed(seed);
        queue.set_queue((0..n).map(track).collect());
        queue.set_shuffle(true);

        let mut seen = HashSet::new();
        seen.insert(queue.current_track().map(|t| t.id.clone()));
        for _ in 1..n {
            queue.advance_next();
            prop_assert!(seen.insert(queue.current_track().map(|t| t.id.clone())), "track repeated within a cycle");
        }
        prop_assert_eq!(queue.peek_next(), None);
    }
}
