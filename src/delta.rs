//! External command ingestion: remote state deltas and their bounded queue.
//!
//! The network collaborator parses its wire format into a [`StateDelta`] and
//! pushes it through the [`DeltaQueue`]; the controller drains the queue at
//! the start of each tick, so remote changes share the cooperative context
//! with local input. Validation happens here: a delta carrying any
//! non-finite number is rejected whole, never partially applied.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::effect::EffectId;
use crate::state::DeviceState;

/// A remote request to change part of the device state.
///
/// Absent fields are left untouched. Numeric fields use the external scale
/// (degrees and percent); conversion to internal units happens on apply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StateDelta {
    pub power: Option<bool>,
    pub effect: Option<EffectId>,
    /// Internal speed value, usually from a named preset.
    pub speed: Option<f32>,
    /// Hue in degrees, `0..360`.
    pub hue: Option<f32>,
    /// Saturation percent, `0..100`; maps onto the band spread.
    pub saturation: Option<f32>,
    /// Brightness percent, `0..100`.
    pub brightness: Option<f32>,
}

/// Why a delta was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeltaError {
    /// A numeric field was NaN or infinite.
    NonFinite,
}

impl StateDelta {
    /// Merge this delta over `current`, yielding the candidate state.
    ///
    /// Range scaling to internal units happens here; range *clamping* is
    /// left to `apply_state` like every other mutation path.
    pub fn apply_to(&self, current: &DeviceState) -> Result<DeviceState, DeltaError> {
        for value in [self.speed, self.hue, self.saturation, self.brightness]
            .into_iter()
            .flatten()
        {
            if !value.is_finite() {
                return Err(DeltaError::NonFinite);
            }
        }

        let mut next = *current;
        if let Some(power) = self.power {
            next.on = power;
        }
        if let Some(effect) = self.effect {
            next.effect = effect;
        }
        if let Some(speed) = self.speed {
            // A remote speed always restarts a stopped animation.
            next.speed = speed;
            next.stopped = false;
        }
        if let Some(hue) = self.hue {
            next.hue = hue / 360.0;
        }
        if let Some(saturation) = self.saturation {
            next.angle = saturation / 100.0;
        }
        if let Some(brightness) = self.brightness {
            next.brightness = brightness / 100.0;
        }
        Ok(next)
    }
}

/// Bounded, interrupt-safe queue of pending deltas.
///
/// Backed by a fixed-size `heapless::Deque` behind a critical section, so
/// senders may live on another execution context than the draining
/// controller.
pub struct DeltaQueue<const SIZE: usize> {
    inner: Mutex<RefCell<Deque<StateDelta, SIZE>>>,
}

impl<const SIZE: usize> DeltaQueue<SIZE> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Get a sender handle. Multiple senders share the same queue.
    pub const fn sender(&self) -> DeltaSender<'_, SIZE> {
        DeltaSender { queue: self }
    }

    /// Get the receiver handle for the controller.
    pub const fn receiver(&self) -> DeltaReceiver<'_, SIZE> {
        DeltaReceiver { queue: self }
    }

    fn try_send(&self, delta: StateDelta) -> Result<(), StateDelta> {
        critical_section::with(|cs| {
            self.inner.borrow(cs).borrow_mut().push_back(delta)
        })
    }

    fn try_receive(&self) -> Option<StateDelta> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().pop_front())
    }
}

impl<const SIZE: usize> Default for DeltaQueue<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sender half of a [`DeltaQueue`].
#[derive(Clone, Copy)]
pub struct DeltaSender<'a, const SIZE: usize> {
    queue: &'a DeltaQueue<SIZE>,
}

impl<const SIZE: usize> DeltaSender<'_, SIZE> {
    /// Enqueue a delta. Returns it back when the queue is full.
    pub fn try_send(&self, delta: StateDelta) -> Result<(), StateDelta> {
        self.queue.try_send(delta)
    }
}

/// Receiver half of a [`DeltaQueue`].
#[derive(Clone, Copy)]
pub struct DeltaReceiver<'a, const SIZE: usize> {
    queue: &'a DeltaQueue<SIZE>,
}

impl<const SIZE: usize> DeltaReceiver<'_, SIZE> {
    /// Dequeue the oldest pending delta, if any.
    pub fn try_receive(&self) -> Option<StateDelta> {
        self.queue.try_receive()
    }
}
