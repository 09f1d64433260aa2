//! Canonical device state and its field invariants.
//!
//! [`DeviceState`] is the single source of truth for what the strand should
//! be doing. The controller owns the live copy and hands out value snapshots;
//! every mutation goes through sanitization so the system always converges to
//! a valid state instead of rejecting updates.

use crate::effect::EffectId;
use crate::math::limiting_wrap;

/// Speed the animation starts at, in cycle units per millisecond step.
pub const DEFAULT_SPEED: f32 = 0.04;
/// Hue the strand starts at (1.0 = 360 degrees).
pub const DEFAULT_HUE: f32 = 0.56;
/// Spread of the travelling band away from the base hue (1.0 = 360 degrees).
pub const DEFAULT_ANGLE: f32 = 0.68;
/// Brightness the strand starts at (1.0 = 100%).
pub const DEFAULT_BRIGHTNESS: f32 = 0.50;

/// Below this there is no meaningful output from the strip.
pub const MIN_BRIGHTNESS: f32 = 0.02;
/// Slowest representable nonzero speed; below it a stop is requested instead.
pub const MIN_SPEED: f32 = 0.01;
/// Fastest speed.
pub const MAX_SPEED: f32 = 1.0;

/// Which single state parameter the physical encoder is currently bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EncoderMode {
    #[default]
    Off = 0,
    Colour = 1,
    Angle = 2,
    Brightness = 3,
    Speed = 4,
    Effect = 5,
}

const MODE_COUNT: i32 = 6;

impl EncoderMode {
    /// Decode a persisted discriminant. Unknown values are treated as absent.
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Off,
            1 => Self::Colour,
            2 => Self::Angle,
            3 => Self::Brightness,
            4 => Self::Speed,
            5 => Self::Effect,
            _ => return None,
        })
    }

    /// Step to the neighbouring mode, wrapping at both ends.
    pub fn cycled(self, step: i32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let next = limiting_wrap(self as i32 + step, 0, MODE_COUNT) as u8;
        Self::from_raw(next).unwrap_or_default()
    }
}

/// Whether the physical control is picking a parameter or changing its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuMode {
    #[default]
    Select,
    Adjust,
}

impl MenuMode {
    pub fn advanced(self) -> Self {
        match self {
            Self::Select => Self::Adjust,
            Self::Adjust => Self::Select,
        }
    }
}

/// The authoritative animation and power state of the strand.
///
/// `speed` always holds the last nonzero speed; `stopped` alone marks a zero
/// effective speed, so resuming restores the remembered pace instantly. A
/// candidate handed to the controller with `speed == 0.0` is the request to
/// stop (see `Controller::apply_state`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceState {
    /// Base hue in `[0, 1)`, wrapping.
    pub hue: f32,
    /// Band spread in `[0, 1]`, clamped.
    pub angle: f32,
    /// Animation speed in `[MIN_SPEED, MAX_SPEED]`, clamped.
    pub speed: f32,
    /// Target brightness in `[MIN_BRIGHTNESS, 1.0]`, clamped.
    pub brightness: f32,
    pub effect: EffectId,
    pub encoder_mode: EncoderMode,
    /// Power intent. Turning off clears nothing else.
    pub on: bool,
    /// True iff the effective speed is zero.
    pub stopped: bool,
    /// From the presence collaborator; true when nobody is around.
    pub absent: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            hue: DEFAULT_HUE,
            angle: DEFAULT_ANGLE,
            speed: DEFAULT_SPEED,
            brightness: DEFAULT_BRIGHTNESS,
            effect: EffectId::default(),
            encoder_mode: EncoderMode::Off,
            on: true,
            stopped: false,
            absent: false,
        }
    }
}

impl DeviceState {
    /// Effective animation speed, accounting for a stop.
    pub fn effective_speed(&self) -> f32 {
        if self.stopped { 0.0 } else { self.speed }
    }

    /// Clamp every field into its documented range.
    ///
    /// Non-finite floats reset to the compiled-in default for that field;
    /// out-of-range values are pulled to the nearest bound. A zero speed is
    /// preserved as-is: it encodes a stop request, which the controller
    /// resolves against the previous state.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.hue = wrap_or_default(self.hue, DEFAULT_HUE);
        self.angle = clamp_or_default(self.angle, 0.0, 1.0, DEFAULT_ANGLE);
        self.brightness =
            clamp_or_default(self.brightness, MIN_BRIGHTNESS, 1.0, DEFAULT_BRIGHTNESS);
        if self.speed != 0.0 {
            self.speed = clamp_or_default(self.speed, MIN_SPEED, MAX_SPEED, DEFAULT_SPEED);
        }
        self
    }
}

fn wrap_or_default(v: f32, default: f32) -> f32 {
    if !v.is_finite() {
        return default;
    }
    let mut v = v % 1.0;
    if v < 0.0 {
        v += 1.0;
    }
    v
}

fn clamp_or_default(v: f32, min: f32, max: f32, default: f32) -> f32 {
    if !v.is_finite() {
        return default;
    }
    v.clamp(min, max)
}
