//! Smooth brightness transitions for power flips.
//!
//! A fade is armed whenever the power intent toggles and is consumed by the
//! render loop until it elapses. Outside the fade window the engine is inert
//! and effective brightness follows the state directly.

use embassy_time::{Duration, Instant};

use crate::math::{eased_progress, unit_to_u8};

/// Fade durations for power flips.
#[derive(Debug, Clone, Copy)]
pub struct FadeTimings {
    /// Duration of the fade when turning on.
    pub fade_in: Duration,
    /// Duration of the fade when turning off.
    pub fade_out: Duration,
}

impl Default for FadeTimings {
    fn default() -> Self {
        Self {
            fade_in: Duration::from_millis(1000),
            fade_out: Duration::from_millis(1500),
        }
    }
}

/// Cosine-eased brightness ramp between two levels.
#[derive(Debug, Clone)]
pub(crate) struct BrightnessFade {
    start_time: Instant,
    duration: Duration,
    from: f32,
    to: f32,
    active: bool,
    /// Last value handed to the renderer, quantized to strip resolution.
    last_applied: u8,
}

impl BrightnessFade {
    pub(crate) fn new(initial: f32) -> Self {
        Self {
            start_time: Instant::from_millis(0),
            duration: Duration::from_millis(0),
            from: initial,
            to: initial,
            active: false,
            last_applied: unit_to_u8(initial),
        }
    }

    /// Arm a fade from the current effective brightness to `to`.
    pub(crate) fn start(&mut self, from: f32, to: f32, duration: Duration, now: Instant) {
        self.start_time = now;
        self.duration = duration;
        self.from = from;
        self.to = to;
        self.active = duration.as_millis() > 0 && from != to;
        if !self.active {
            self.from = to;
        }
    }

    pub(crate) const fn is_active(&self) -> bool {
        self.active
    }

    /// Effective brightness at `now`.
    pub(crate) fn current(&self, now: Instant) -> f32 {
        if !self.active {
            return self.to;
        }
        if now <= self.start_time {
            return self.from;
        }
        let elapsed = now - self.start_time;
        if elapsed >= self.duration {
            return self.to;
        }
        #[allow(clippy::cast_precision_loss)]
        let t = elapsed.as_millis() as f32 / self.duration.as_millis() as f32;
        self.from + eased_progress(t) * (self.to - self.from)
    }

    /// Advance the fade and report the new effective brightness when it
    /// differs from the last applied value.
    ///
    /// The comparison is done at strip resolution so a slow fade does not
    /// produce a stream of redundant updates.
    pub(crate) fn tick(&mut self, now: Instant) -> Option<f32> {
        let value = self.current(now);
        if self.active && now >= self.start_time && (now - self.start_time) >= self.duration {
            self.active = false;
            self.from = self.to;
        }
        let quantized = unit_to_u8(value);
        if quantized == self.last_applied {
            return None;
        }
        self.last_applied = quantized;
        Some(value)
    }

    /// Jump to a new resting level without animating.
    ///
    /// Used when brightness is adjusted live while no power flip is in
    /// flight.
    pub(crate) fn snap_to(&mut self, value: f32) {
        if self.active {
            // A fade in flight retargets; its origin stays put.
            self.to = value;
            return;
        }
        self.from = value;
        self.to = value;
    }
}
