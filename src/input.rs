//! Local input reconciliation: encoder detents and button events become
//! candidate states.
//!
//! The reconciler is a state machine over `(MenuMode, EncoderMode)`. It never
//! mutates the device state itself; it produces a candidate plus the side
//! requests (animation clock, one-shot render, save) for the controller to
//! act on in order.

use embassy_time::Duration;
use smart_leds::RGB8;

use crate::math::wrap;
use crate::state::{DeviceState, EncoderMode, MenuMode, MAX_SPEED, MIN_BRIGHTNESS, MIN_SPEED};

/// Hold time that turns a press of the secondary button into a save.
pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(1500);

/// Raw detents above this magnitude are treated as a full-speed twist.
const MAX_DETENTS: i32 = 10;
/// One detent moves an adjusted value by 1/50 of its range.
const DETENT_SCALE: f32 = 50.0;

/// Debounced press classification from the secondary button driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressDuration {
    #[default]
    Short,
    Long,
}

impl From<Duration> for PressDuration {
    fn from(duration: Duration) -> Self {
        if duration >= LONG_PRESS_DURATION {
            Self::Long
        } else {
            Self::Short
        }
    }
}

/// One tick's worth of drained local input.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputEvents {
    /// Accumulated signed detents since the last tick.
    pub rotation: i32,
    /// The encoder's own button was clicked.
    pub clicked: bool,
    /// Debounced secondary-button press, if one completed.
    pub button: Option<PressDuration>,
}

impl InputEvents {
    pub(crate) fn is_empty(&self) -> bool {
        self.rotation == 0 && !self.clicked && self.button.is_none()
    }
}

/// What a round of reconciliation asks the controller to do.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reconciled {
    pub candidate: DeviceState,
    /// Requested animation clock state, if it should change.
    pub cycle: Option<bool>,
    /// A static parameter changed; render one frame even while paused.
    pub render_once: bool,
    /// Long press: persist the current state.
    pub save_requested: bool,
}

/// Interprets encoder deltas and button events against the current menu.
#[derive(Debug, Default)]
pub(crate) struct Reconciler {
    menu_mode: MenuMode,
}

impl Reconciler {
    pub(crate) const fn new() -> Self {
        Self {
            menu_mode: MenuMode::Select,
        }
    }

    pub(crate) const fn menu_mode(&self) -> MenuMode {
        self.menu_mode
    }

    /// Leave the menu without touching the light (encoder-idle timeout).
    pub(crate) fn exit_menu(&mut self) {
        self.menu_mode = MenuMode::Select;
    }

    pub(crate) fn reconcile(&mut self, state: &DeviceState, events: &InputEvents) -> Reconciled {
        let mut out = Reconciled {
            candidate: *state,
            cycle: None,
            render_once: false,
            save_requested: false,
        };

        if events.rotation != 0 {
            self.apply_rotation(state, events.rotation, &mut out);
        }

        if events.clicked {
            if out.candidate.encoder_mode == EncoderMode::Off {
                // A click while idle jumps straight into colour adjustment.
                out.candidate.encoder_mode = EncoderMode::Colour;
                self.menu_mode = MenuMode::Adjust;
            } else {
                self.menu_mode = self.menu_mode.advanced();
            }
            out.cycle = Some(true);
        }

        match events.button {
            Some(PressDuration::Short) => {
                out.candidate = DeviceState {
                    absent: state.absent,
                    ..DeviceState::default()
                };
                self.menu_mode = MenuMode::Select;
                out.cycle = Some(true);
            }
            Some(PressDuration::Long) => out.save_requested = true,
            None => {}
        }

        out
    }

    fn apply_rotation(&mut self, state: &DeviceState, rotation: i32, out: &mut Reconciled) {
        // Each detent is one step in Select; in Adjust the magnitude matters,
        // clamped so one tick moves a value by at most 20% of its range.
        let step = if rotation < 0 { -1 } else { 1 };
        #[allow(clippy::cast_precision_loss)]
        let count = rotation.clamp(-MAX_DETENTS, MAX_DETENTS) as f32 / DETENT_SCALE;

        let candidate = &mut out.candidate;
        match self.menu_mode {
            MenuMode::Select => {
                candidate.encoder_mode = candidate.encoder_mode.cycled(step);
            }
            MenuMode::Adjust => {
                if candidate.encoder_mode == EncoderMode::Off {
                    return;
                }
                // Adjusting anything but speed freezes the pattern so the
                // change is visible in place.
                out.cycle = Some(candidate.encoder_mode == EncoderMode::Speed);

                match candidate.encoder_mode {
                    EncoderMode::Off => {}
                    EncoderMode::Colour => {
                        candidate.hue = wrap(candidate.hue + count, 0.0, 1.0);
                        out.render_once = true;
                    }
                    EncoderMode::Angle => {
                        candidate.angle = (candidate.angle + count).clamp(0.0, 1.0);
                        out.render_once = true;
                    }
                    EncoderMode::Brightness => {
                        candidate.brightness =
                            (candidate.brightness + count).clamp(MIN_BRIGHTNESS, 1.0);
                        // Live feedback while the detent is still moving.
                        out.render_once = true;
                    }
                    EncoderMode::Speed => {
                        Self::adjust_speed(state, count, candidate);
                    }
                    EncoderMode::Effect => {
                        candidate.effect = candidate.effect.cycled(step);
                        out.render_once = true;
                    }
                }
            }
        }
    }

    /// Speed adjustment may pass through zero: stopping remembers the last
    /// nonzero speed, resuming restores it.
    fn adjust_speed(state: &DeviceState, count: f32, candidate: &mut DeviceState) {
        if state.stopped {
            if count > 0.0 {
                // Resume at the remembered pace.
                candidate.speed = state.speed;
                candidate.stopped = false;
            }
            return;
        }

        let next = state.speed + count;
        if next < MIN_SPEED {
            // Request a stop; the remembered speed is preserved downstream.
            candidate.speed = 0.0;
        } else {
            candidate.speed = next.clamp(MIN_SPEED, MAX_SPEED);
        }
    }
}

/// Feedback LED color for the given encoder mode.
pub(crate) const fn mode_color(mode: EncoderMode) -> RGB8 {
    let col: u32 = match mode {
        EncoderMode::Off => 0x000000,
        EncoderMode::Colour => 0xFF_FF00,     // yellow
        EncoderMode::Angle => 0xFF_8000,      // orange
        EncoderMode::Brightness => 0xFF_FFFF, // white
        EncoderMode::Speed => 0xFF_0000,      // red
        EncoderMode::Effect => 0xFF_00FF,     // purple
    };
    RGB8 {
        r: ((col >> 16) & 0xFF) as u8,
        g: ((col >> 8) & 0xFF) as u8,
        b: (col & 0xFF) as u8,
    }
}

/// Halve each channel; used for the adjust-mode blink.
pub(crate) const fn dimmed(color: RGB8) -> RGB8 {
    RGB8 {
        r: color.r >> 1,
        g: color.g >> 1,
        b: color.b >> 1,
    }
}
