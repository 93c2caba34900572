//! Rangefinder command framing.
//!
//! Requests use the device's "long" frame format:
//!
//! ```text
//! [0xC0] [command] [payload len] [payload ...] [crc]
//! ```
//!
//! The trailing CRC covers every preceding byte. Responses arrive as raw
//! notification payloads: byte 0 is the device status code (0 = success),
//! command-specific fields follow.

use bytes::Bytes;

use crate::checksum::{self, REQUEST_CRC};

/// Header byte selecting the long request frame format.
pub const FRAME_LONG: u8 = 0xC0;

/// Command id: trigger a single distance measurement.
pub const CMD_MEASURE: u8 = 64;

/// Command id: turn the laser on.
pub const CMD_LASER_ON: u8 = 65;

/// Measurement mode byte: front reference, single shot, auto adjust.
pub const MODE_FRONT_SINGLE_AUTO: u8 = 0x00;

/// Millimeters per raw distance unit — the device reports multiples of 50 µm.
pub const MM_PER_UNIT: f64 = 0.05;

/// Byte offset of the distance field inside a measurement response.
pub const DISTANCE_OFFSET: usize = 2;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("payload length {0} does not fit the one-byte length field")]
    PayloadTooLarge(usize),

    #[error("response carries no status byte")]
    EmptyResponse,

    #[error("response too short: need {need} bytes, have {have}")]
    ResponseTooShort { need: usize, have: usize },
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encode a command frame: header, command id, payload length, payload,
/// trailing CRC over all preceding bytes.
pub fn encode_command(command: u8, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > u8::MAX as usize {
        return Err(FrameError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(FRAME_LONG);
    frame.push(command);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);
    frame.push(checksum::compute(&frame, &REQUEST_CRC));
    Ok(frame)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// A raw notification delivered by the transport in answer to a command.
#[derive(Debug, Clone)]
pub struct Response {
    raw: Bytes,
}

impl Response {
    /// Wrap a notification payload. The payload must carry at least the
    /// status byte.
    pub fn from_notification(raw: Bytes) -> Result<Self, FrameError> {
        if raw.is_empty() {
            return Err(FrameError::EmptyResponse);
        }
        Ok(Self { raw })
    }

    /// Device status code. Zero means success.
    pub fn status(&self) -> u8 {
        self.raw[0]
    }

    pub fn is_ok(&self) -> bool {
        self.status() == 0
    }

    /// Little-endian 32-bit signed field starting at `offset`.
    pub fn i32_le(&self, offset: usize) -> Result<i32, FrameError> {
        match self.raw.get(offset..offset + 4) {
            Some(b) => Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            None => Err(FrameError::ResponseTooShort {
                need: offset + 4,
                have: self.raw.len(),
            }),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
