//! Per-pixel frame computation for the two strand effects.
//!
//! The renderer is a pure function of `{hue, angle, phase, effect,
//! brightness}`: it fills a caller-owned RGBW buffer and leaves clocking the
//! data out to the strip to the [`OutputDriver`](crate::OutputDriver).

use core::f32::consts::PI;

use libm::sinf;
use smart_leds::hsv::{Hsv, hsv2rgb};
use smart_leds::{RGBW, White};

use crate::effect::EffectId;
use crate::math::{scale_component, unit_to_u8, wrap};

/// RGBW pixel as handed to the output driver.
pub type Rgbw = RGBW<u8>;

/// A dark pixel.
pub const PIXEL_OFF: Rgbw = Rgbw {
    r: 0,
    g: 0,
    b: 0,
    a: White(0),
};

/// Animation phase divisor: milliseconds of unpaused time times speed are
/// scaled down by this before entering the sine.
const PHASE_SCALE: f32 = 200.0;

/// Parameters for one frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameParams {
    pub hue: f32,
    pub angle: f32,
    /// Unpaused animation time in milliseconds, already speed-scaled.
    pub time: f32,
    pub effect: EffectId,
    /// Effective brightness in `[0, 1]`, transitions included.
    pub brightness: f32,
}

/// Fill `frame` with one rendered frame.
pub(crate) fn fill_frame(frame: &mut [Rgbw], params: &FrameParams) {
    if frame.is_empty() {
        return;
    }

    let hue_deg = params.hue * 360.0;
    let angle_deg = params.angle * 360.0;
    let t = params.time / PHASE_SCALE;

    #[allow(clippy::cast_precision_loss)]
    let count = frame.len() as f32;
    for (i, pixel) in frame.iter_mut().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let percent_along = i as f32 / count;
        let offset = sinf((percent_along + 0.5 + t) * PI) * angle_deg;
        let h = wrap((hue_deg + offset) / 360.0, 0.0, 1.0);

        *pixel = match params.effect {
            EffectId::HueCycle => {
                let rgb = hsv2rgb(Hsv {
                    hue: unit_to_u8(h),
                    sat: 255,
                    val: 255,
                });
                Rgbw {
                    r: rgb.r,
                    g: rgb.g,
                    b: rgb.b,
                    a: White(0),
                }
            }
            EffectId::WhiteChase => Rgbw {
                r: 0,
                g: 0,
                b: 0,
                a: White(unit_to_u8(1.0 - h)),
            },
        };
    }

    apply_brightness(frame, params.brightness);
}

/// Scale every channel by the effective brightness.
fn apply_brightness(frame: &mut [Rgbw], brightness: f32) {
    if brightness >= 1.0 {
        return;
    }
    if brightness <= 0.0 {
        frame.fill(PIXEL_OFF);
        return;
    }
    for pixel in frame.iter_mut() {
        pixel.r = scale_component(pixel.r, brightness);
        pixel.g = scale_component(pixel.g, brightness);
        pixel.b = scale_component(pixel.b, brightness);
        pixel.a = White(scale_component(pixel.a.0, brightness));
    }
}
