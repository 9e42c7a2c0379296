//! Crossfade ramp between two units
//!
//! Gains are evaluated from elapsed wall time on every engine poll, so the
//! ramp stays correct regardless of poll jitter.

use std::f32::consts::PI;
use std::time::{Duration, Instant};

/// Crossfade curve type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeCurve {
    /// Linear fade: simple and predictable
    #[default]
    Linear,

    /// Equal power fade: constant perceived loudness through the midpoint
    EqualPower,
}

impl FadeCurve {
    /// Gain at normalized `position` (0.0 to 1.0) for the fading-in side
    #[inline]
    pub fn fade_in_gain(self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::EqualPower => (t * PI * 0.5).sin(),
        }
    }

    /// Gain at normalized `position` (0.0 to 1.0) for the fading-out side
    #[inline]
    pub fn fade_out_gain(self, position: f32) -> f32 {
        self.fade_in_gain(1.0 - position.clamp(0.0, 1.0))
    }
}

/// Gains for both sides of a crossfade at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampGains {
    pub outgoing: f32,
    pub incoming: f32,
    pub finished: bool,
}

/// A running crossfade
#[derive(Debug, Clone)]
pub struct CrossfadeRamp {
    started: Instant,
    duration: Duration,
    curve: FadeCurve,
    outgoing_start: f32,
    target: f32,
}

impl CrossfadeRamp {
    /// Ramp from `outgoing_start` to silence while the incoming side rises to `target`
    pub fn new(started: Instant, duration: Duration, curve: FadeCurve, outgoing_start: f32, target: f32) -> Self {
        Self {
            started,
            duration,
            curve,
            outgoing_start,
            target,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Normalized progress at `now`
    pub fn progress(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    pub fn gains(&self, now: Instant) -> RampGains {
        let p = self.progress(now);
        RampGains {
            outgoing: self.outgoing_start * self.curve.fade_out_gain(p),
            incoming: self.target * self.curve.fade_in_gain(p),
            finished: p >= 1.0,
        }
    }

    /// Retarget the incoming side (volume changed mid-fade)
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }
}
