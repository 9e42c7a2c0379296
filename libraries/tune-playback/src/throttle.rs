//! Position update throttling
//!
//! The engine reports time every 250ms. Renderers and OS media sessions only
//! need a coarser feed, except right after a seek when the jump must show up
//! immediately.

use std::time::{Duration, Instant};

/// Coalesces position updates
#[derive(Debug, Clone)]
pub struct PositionThrottle {
    window: Duration,
    jump: Duration,
    last: Option<(Instant, Duration)>,
}

impl PositionThrottle {
    /// Forward at most once per `window`, or immediately when the position
    /// moved by more than `jump` relative to the expected playhead
    pub fn new(window: Duration, jump: Duration) -> Self {
        Self {
            window,
            jump,
            last: None,
        }
    }

    /// Whether an update at `position` observed at `now` should be forwarded
    pub fn should_emit(&mut self, now: Instant, position: Duration) -> bool {
        let emit = match self.last {
            None => true,
            Some((at, last_position)) => {
                let elapsed = now.saturating_duration_since(at);
                let expected = last_position + elapsed;
                let drift = if position > expected {
                    position - expected
                } else {
                    expected - position
                };
                elapsed >= self.window || drift > self.jump
            }
        };

        if emit {
            self.last = Some((now, position));
        }
        emit
    }

    /// Forget the last emission (new track loaded)
    pub fn reset(&mut self) {
        self.last = None;
    }
}
