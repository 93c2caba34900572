//! CRC-8 checksum for rangefinder request frames.
//!
//! Every request frame ends with an 8-bit CRC computed over all preceding
//! bytes. The algorithm is the standard parameterized CRC-8: MSB-first
//! polynomial division with configurable polynomial and initial value,
//! optional bit reflection of input bytes and output, and a final XOR.

/// Parameters of an 8-bit CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumConfig {
    /// Generator polynomial, MSB-first representation.
    pub polynomial: u8,
    /// Register value before the first input byte.
    pub init: u8,
    /// Reflect each input byte before it enters the register.
    pub reflect_in: bool,
    /// Reflect the register after the last input byte.
    pub reflect_out: bool,
    /// XORed into the register at the end.
    pub xor_out: u8,
}

/// CRC parameterization of the rangefinder's request mode:
/// polynomial 0xA6, initial value 0xAA, no reflection, no final XOR.
pub const REQUEST_CRC: ChecksumConfig = ChecksumConfig {
    polynomial: 0xA6,
    init: 0xAA,
    reflect_in: false,
    reflect_out: false,
    xor_out: 0x00,
};

/// Compute the CRC of `data` under `config`.
///
/// Pure function of its inputs; any byte sequence including the empty
/// slice is valid.
pub fn compute(data: &[u8], config: &ChecksumConfig) -> u8 {
    let mut crc = config.init;
    for &byte in data {
        let byte = if config.reflect_in {
            byte.reverse_bits()
        } else {
            byte
        };
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ config.polynomial
            } else {
                crc << 1
            };
        }
    }
    if config.reflect_out {
        crc = crc.reverse_bits();
    }
    crc ^ config.xor_out
}
