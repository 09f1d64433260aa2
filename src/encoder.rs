//! Interrupt-to-main-loop handoff for the rotary encoder.
//!
//! The decoder ISR is the single producer: it accumulates detents and marks
//! clicks using word-sized atomics, never anything larger. The controller is
//! the single consumer and drains everything with a read-and-clear at the
//! start of a tick. No blocking synchronization exists on this path.

use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Shared flag-and-counter block between the encoder ISR and the controller.
///
/// Place one in a `static` and hand references to both sides.
#[derive(Debug, Default)]
pub struct EncoderShared {
    rotation: AtomicI32,
    has_data: AtomicBool,
    clicked: AtomicBool,
}

impl EncoderShared {
    pub const fn new() -> Self {
        Self {
            rotation: AtomicI32::new(0),
            has_data: AtomicBool::new(false),
            clicked: AtomicBool::new(false),
        }
    }

    /// Record detents from the ISR. Positive is clockwise.
    pub fn add_rotation(&self, detents: i32) {
        if detents == 0 {
            return;
        }
        self.rotation.fetch_add(detents, Ordering::Relaxed);
        self.has_data.store(true, Ordering::Release);
    }

    /// Record a debounced click from the ISR.
    pub fn mark_clicked(&self) {
        self.clicked.store(true, Ordering::Release);
    }

    /// Consume the accumulated rotation, if any arrived since the last call.
    pub(crate) fn take_rotation(&self) -> Option<i32> {
        if !self.has_data.swap(false, Ordering::Acquire) {
            return None;
        }
        Some(self.rotation.swap(0, Ordering::AcqRel))
    }

    /// Consume a pending click.
    pub(crate) fn take_clicked(&self) -> bool {
        self.clicked.swap(false, Ordering::Acquire)
    }
}
