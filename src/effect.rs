//! Effect identifiers and the wire-name vocabulary.
//!
//! The command channel speaks in strings; everything here exists so it can
//! translate between wire-level text and the internal enums without knowing
//! how either side renders.

const EFFECT_NAME_HUE_CYCLE: &str = "hue_cycle";
const EFFECT_NAME_WHITE_CHASE: &str = "white_chase";

const EFFECT_ID_HUE_CYCLE: u8 = 0;
const EFFECT_ID_WHITE_CHASE: u8 = 1;

/// Known pixel-coloring algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EffectId {
    /// Travelling band sweeping through hue.
    #[default]
    HueCycle = EFFECT_ID_HUE_CYCLE,
    /// Travelling band on the dedicated white channel.
    WhiteChase = EFFECT_ID_WHITE_CHASE,
}

impl EffectId {
    /// Every effect, in capability-list order.
    pub const ALL: [Self; 2] = [Self::HueCycle, Self::WhiteChase];

    /// Decode a persisted discriminant. Unknown values are treated as absent.
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            EFFECT_ID_HUE_CYCLE => Self::HueCycle,
            EFFECT_ID_WHITE_CHASE => Self::WhiteChase,
            _ => return None,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HueCycle => EFFECT_NAME_HUE_CYCLE,
            Self::WhiteChase => EFFECT_NAME_WHITE_CHASE,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            EFFECT_NAME_HUE_CYCLE => Some(Self::HueCycle),
            EFFECT_NAME_WHITE_CHASE => Some(Self::WhiteChase),
            _ => None,
        }
    }

    /// Step to the neighbouring effect, wrapping at both ends.
    pub fn cycled(self, step: i32) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = Self::ALL.len() as i32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let next = crate::math::limiting_wrap(self as i32 + step, 0, count) as u8;
        Self::from_raw(next).unwrap_or_default()
    }
}

const SPEED_NAME_SLOW: &str = "slow";
const SPEED_NAME_MEDIUM: &str = "medium";
const SPEED_NAME_FAST: &str = "fast";

/// Named speeds the command channel can request alongside an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpeedPreset {
    Slow,
    Medium,
    Fast,
}

impl SpeedPreset {
    /// Every preset, in capability-list order.
    pub const ALL: [Self; 3] = [Self::Slow, Self::Medium, Self::Fast];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slow => SPEED_NAME_SLOW,
            Self::Medium => SPEED_NAME_MEDIUM,
            Self::Fast => SPEED_NAME_FAST,
        }
    }

    pub fn parse_from_str(s: &str) -> Option<Self> {
        match s {
            SPEED_NAME_SLOW => Some(Self::Slow),
            SPEED_NAME_MEDIUM => Some(Self::Medium),
            SPEED_NAME_FAST => Some(Self::Fast),
            _ => None,
        }
    }

    /// The internal speed value this preset maps to.
    pub const fn value(self) -> f32 {
        match self {
            Self::Slow => 0.02,
            Self::Medium => crate::state::DEFAULT_SPEED,
            Self::Fast => 0.12,
        }
    }
}

/// Parse an effect spec of the form `"<effect-name>[:<speed-name>]"`.
///
/// Returns `None` when either part is unknown; a malformed spec is dropped
/// whole rather than partially applied.
pub fn parse_effect_spec(spec: &str) -> Option<(EffectId, Option<f32>)> {
    match spec.split_once(':') {
        None => Some((EffectId::parse_from_str(spec)?, None)),
        Some((effect, speed)) => {
            let effect = EffectId::parse_from_str(effect)?;
            let speed = SpeedPreset::parse_from_str(speed)?.value();
            Some((effect, Some(speed)))
        }
    }
}
