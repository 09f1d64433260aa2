//! Fixed-layout state record persisted to non-volatile storage.
//!
//! The record is a flat snapshot behind an 8-byte magic tag and a size field.
//! A record whose magic or size does not match the current build is reported
//! as absent, not as an error: that is the documented first-boot and
//! incompatible-saved-format case, and the caller substitutes defaults.

use crate::effect::EffectId;
use crate::state::{DeviceState, EncoderMode};

/// Total persisted record size; the storage region must hold this much.
pub const RECORD_SIZE: usize = 256;

const MAGIC: [u8; 8] = *b"STRNDLC1";
const MAGIC_LEN: usize = MAGIC.len();
const SIZE_FIELD_LEN: usize = 4;

/// Encoded [`DeviceState`] length: four f32 fields plus four flag bytes.
const STATE_LEN: usize = 20;
const HEADER_LEN: usize = MAGIC_LEN + SIZE_FIELD_LEN;

/// Byte-region access to the fixed storage slot holding the record.
///
/// Implementations wrap the platform flash (or an in-memory region in
/// tests). The codec calls `erase_and_program` inside a critical section:
/// on flash parts that execute code from the same memory, the erase/program
/// window must not interleave with execution.
pub trait StateStorage {
    /// Read the whole record region.
    fn read(&mut self, buf: &mut [u8; RECORD_SIZE]) -> Result<(), StorageError>;

    /// Erase the region and program the given record.
    fn erase_and_program(&mut self, buf: &[u8; RECORD_SIZE]) -> Result<(), StorageError>;
}

/// Failure reported by the underlying storage primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageError;

/// Why a load produced no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// No valid record: blank region, foreign magic, or a record written by
    /// a build with a different state layout.
    NotFound,
    /// The storage primitive itself failed to read.
    Storage(StorageError),
}

/// Serialize `state` and write it to the fixed storage region.
///
/// Interrupts are disabled for the duration of the erase/program and
/// restored unconditionally afterwards.
pub fn save<S: StateStorage>(storage: &mut S, state: &DeviceState) -> Result<(), StorageError> {
    let buf = encode(state);
    critical_section::with(|_| storage.erase_and_program(&buf))
}

/// Read the region and decode the record, if one is present.
pub fn load<S: StateStorage>(storage: &mut S) -> Result<DeviceState, LoadError> {
    let mut buf = [0u8; RECORD_SIZE];
    storage.read(&mut buf).map_err(LoadError::Storage)?;

    if buf[..MAGIC_LEN] != MAGIC {
        return Err(LoadError::NotFound);
    }
    let size = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
    if size as usize != STATE_LEN {
        return Err(LoadError::NotFound);
    }

    Ok(decode(&buf[HEADER_LEN..HEADER_LEN + STATE_LEN]))
}

fn encode(state: &DeviceState) -> [u8; RECORD_SIZE] {
    // 0xFF matches the erased-flash fill pattern.
    let mut buf = [0xFFu8; RECORD_SIZE];
    buf[..MAGIC_LEN].copy_from_slice(&MAGIC);
    buf[MAGIC_LEN..HEADER_LEN].copy_from_slice(&(STATE_LEN as u32).to_le_bytes());

    let body = &mut buf[HEADER_LEN..HEADER_LEN + STATE_LEN];
    body[0..4].copy_from_slice(&state.hue.to_le_bytes());
    body[4..8].copy_from_slice(&state.angle.to_le_bytes());
    body[8..12].copy_from_slice(&state.speed.to_le_bytes());
    body[12..16].copy_from_slice(&state.brightness.to_le_bytes());
    body[16] = state.effect as u8;
    body[17] = state.encoder_mode as u8;
    body[18] = u8::from(state.on);
    body[19] = u8::from(state.stopped);
    buf
}

fn decode(body: &[u8]) -> DeviceState {
    let f32_at = |i: usize| f32::from_le_bytes([body[i], body[i + 1], body[i + 2], body[i + 3]]);

    let state = DeviceState {
        hue: f32_at(0),
        angle: f32_at(4),
        speed: f32_at(8),
        brightness: f32_at(12),
        // Unknown discriminants fall back to defaults instead of failing the
        // whole record.
        effect: EffectId::from_raw(body[16]).unwrap_or_default(),
        encoder_mode: EncoderMode::from_raw(body[17]).unwrap_or_default(),
        on: body[18] != 0,
        stopped: body[19] != 0,
        absent: false,
    };
    let mut state = state.sanitized();
    if state.speed == 0.0 {
        state.speed = crate::state::DEFAULT_SPEED;
        state.stopped = true;
    }
    state
}
