//! Shared mock collaborators for the integration tests.

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::RefCell;
use std::rc::Rc;

use strand_light_control::{
    FeedbackLed, OutputDriver, RECORD_SIZE, RGB8, Rgbw, StateStorage, StorageError,
};

/// Mock strip driver recording every written frame.
pub struct MockStrip {
    pub writes: usize,
    pub last_frame: Vec<Rgbw>,
}

impl MockStrip {
    pub fn new() -> Self {
        Self {
            writes: 0,
            last_frame: Vec::new(),
        }
    }
}

impl OutputDriver for MockStrip {
    fn write(&mut self, colors: &[Rgbw]) {
        self.writes += 1;
        self.last_frame = colors.to_vec();
    }
}

/// Mock encoder feedback LED remembering the last commands.
pub struct MockFeedback {
    pub color: RGB8,
    pub brightness: f32,
}

impl MockFeedback {
    pub fn new() -> Self {
        Self {
            color: RGB8::default(),
            brightness: 0.0,
        }
    }
}

impl FeedbackLed for MockFeedback {
    fn set_color(&mut self, color: RGB8) {
        self.color = color;
    }

    fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness;
    }
}

/// In-memory storage region standing in for flash.
///
/// Clones share the same backing region, so a test can keep a handle while
/// the controller owns its own.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Region>>,
}

struct Region {
    bytes: [u8; RECORD_SIZE],
    programs: usize,
    read_fails: bool,
}

impl MemoryStorage {
    /// Blank region, as on first boot.
    pub fn blank() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Region {
                bytes: [0u8; RECORD_SIZE],
                programs: 0,
                read_fails: false,
            })),
        }
    }

    pub fn programs(&self) -> usize {
        self.inner.borrow().programs
    }

    pub fn byte(&self, index: usize) -> u8 {
        self.inner.borrow().bytes[index]
    }

    pub fn set_byte(&self, index: usize, value: u8) {
        self.inner.borrow_mut().bytes[index] = value;
    }

    pub fn fail_reads(&self) {
        self.inner.borrow_mut().read_fails = true;
    }
}

impl StateStorage for MemoryStorage {
    fn read(&mut self, buf: &mut [u8; RECORD_SIZE]) -> Result<(), StorageError> {
        let region = self.inner.borrow();
        if region.read_fails {
            return Err(StorageError);
        }
        buf.copy_from_slice(&region.bytes);
        Ok(())
    }

    fn erase_and_program(&mut self, buf: &[u8; RECORD_SIZE]) -> Result<(), StorageError> {
        let mut region = self.inner.borrow_mut();
        region.bytes.copy_from_slice(buf);
        region.programs += 1;
        Ok(())
    }
}
