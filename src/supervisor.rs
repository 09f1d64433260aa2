//! Idle timers forcing mode and power transitions.
//!
//! Two independent timers: encoder-idle closes the adjustment menu, global-
//! idle powers the strand off. The global timer fires once per idle period
//! and re-arms only on the next activity, so a timeout produces exactly one
//! power-off request.

use embassy_time::{Duration, Instant};

/// Timeouts for the two idle timers. A `None` global timeout disables
/// auto power-off.
#[derive(Debug, Clone, Copy)]
pub struct IdleTimeouts {
    /// Inactivity before the encoder menu closes.
    pub encoder: Duration,
    /// Inactivity before the strand powers off.
    pub global: Option<Duration>,
}

impl Default for IdleTimeouts {
    fn default() -> Self {
        Self {
            encoder: Duration::from_secs(30),
            global: None,
        }
    }
}

/// What the supervisor wants done this tick.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SupervisorActions {
    /// Force `EncoderMode::Off` and `MenuMode::Select`.
    pub exit_menu: bool,
    /// Force a single `on = false` state change.
    pub power_off: bool,
}

/// Tracks per-subsystem idle time against the configured timeouts.
#[derive(Debug)]
pub(crate) struct ActivitySupervisor {
    timeouts: IdleTimeouts,
    encoder_seen: Instant,
    activity_seen: Instant,
    global_armed: bool,
}

impl ActivitySupervisor {
    pub(crate) fn new(timeouts: IdleTimeouts, now: Instant) -> Self {
        Self {
            timeouts,
            encoder_seen: now,
            activity_seen: now,
            global_armed: true,
        }
    }

    /// Any encoder rotation or click.
    pub(crate) fn note_encoder(&mut self, now: Instant) {
        self.encoder_seen = now;
        self.note_activity(now);
    }

    /// Any state-affecting input, local or remote.
    pub(crate) fn note_activity(&mut self, now: Instant) {
        self.activity_seen = now;
        self.global_armed = true;
    }

    pub(crate) fn poll(&mut self, now: Instant, menu_open: bool, on: bool) -> SupervisorActions {
        let mut actions = SupervisorActions::default();

        if menu_open && now >= self.encoder_seen + self.timeouts.encoder {
            actions.exit_menu = true;
            // Leaving the menu is not activity; the global timer keeps
            // counting from the last real input.
            self.encoder_seen = now;
        }

        if let Some(timeout) = self.timeouts.global {
            if self.global_armed && on && now >= self.activity_seen + timeout {
                actions.power_off = true;
                self.global_armed = false;
            }
        }

        actions
    }
}
