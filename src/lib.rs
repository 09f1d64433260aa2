#![no_std]

pub mod controller;
pub mod delta;
pub mod effect;
pub mod encoder;
pub mod input;
pub mod math;
pub mod persist;
pub mod render;
pub mod state;
pub mod supervisor;
pub mod transition;

pub use controller::{Controller, ControllerConfig, StateObserver};
pub use delta::{DeltaError, DeltaQueue, DeltaReceiver, DeltaSender, StateDelta};
pub use effect::{EffectId, SpeedPreset, parse_effect_spec};
pub use encoder::EncoderShared;
pub use input::{InputEvents, LONG_PRESS_DURATION, PressDuration};
pub use persist::{LoadError, RECORD_SIZE, StateStorage, StorageError};
pub use render::{PIXEL_OFF, Rgbw};
pub use state::{DeviceState, EncoderMode, MenuMode};
pub use supervisor::IdleTimeouts;
pub use transition::FadeTimings;

pub use embassy_time::{Duration, Instant};
pub use smart_leds::RGB8;

/// Abstract LED strip driver trait
///
/// Implement this trait to support different hardware platforms.
/// The controller is generic over this trait.
pub trait OutputDriver {
    /// Write one frame of colors to the LED strip
    fn write(&mut self, colors: &[Rgbw]);
}

/// Encoder feedback LED
///
/// The small RGB LED on the encoder itself, used to show which parameter is
/// selected and to blink while adjusting.
pub trait FeedbackLed {
    /// Set the feedback LED color
    fn set_color(&mut self, color: RGB8);

    /// Set the feedback LED brightness (0.0 to 1.0)
    fn set_brightness(&mut self, brightness: f32);
}
