//! TI ADS1271 Daisy-Chain Framing
//!
//! Eight converters share one chip select in daisy-chain mode; a single
//! transfer clocks out every converter's latest conversion as a 24-bit
//! big-endian two's-complement word, first device first.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Converters in the chain
pub const CHANNELS: usize = 8;

/// Bytes per conversion result
pub const BYTES_PER_CHANNEL: usize = 3;

/// Bytes clocked per transfer
pub const FRAME_SIZE: usize = CHANNELS * BYTES_PER_CHANNEL;

/// Largest positive output code
pub const CODE_MAX: i32 = 0x7F_FFFF;

/// Most negative output code
pub const CODE_MIN: i32 = -0x80_0000;

/// Frame decoding errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer is not exactly one frame long
    #[error("Frame must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// One decoded transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelFrame {
    /// Sequence number of the transfer that produced the frame
    pub sequence: u32,
    /// Signed conversion codes, channel 0 first
    pub codes: [i32; CHANNELS],
}

impl ChannelFrame {
    /// Decode a raw frame tagged with its sequence number
    pub fn decode(sequence: u32, raw: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            sequence,
            codes: decode_frame(raw)?,
        })
    }

    /// Channel voltages for a given reference
    pub fn volts(&self, vref: f64) -> [f64; CHANNELS] {
        self.codes.map(|code| code_to_volts(code, vref))
    }
}

/// Split a raw frame into sign-extended channel codes
pub fn decode_frame(raw: &[u8]) -> Result<[i32; CHANNELS], FrameError> {
    if raw.len() != FRAME_SIZE {
        return Err(FrameError::Length {
            expected: FRAME_SIZE,
            actual: raw.len(),
        });
    }

    let mut codes = [0i32; CHANNELS];
    for (code, word) in codes.iter_mut().zip(raw.chunks_exact(BYTES_PER_CHANNEL)) {
        let unsigned = (u32::from(word[0]) << 16) | (u32::from(word[1]) << 8) | u32::from(word[2]);
        // Shift the 24-bit sign bit into bit 31, then back
        *code = ((unsigned << 8) as i32) >> 8;
    }
    Ok(codes)
}

/// Pack channel codes into a raw frame (codes are clamped to 24 bits)
pub fn encode_frame(codes: &[i32; CHANNELS], raw: &mut [u8]) -> Result<(), FrameError> {
    if raw.len() != FRAME_SIZE {
        return Err(FrameError::Length {
            expected: FRAME_SIZE,
            actual: raw.len(),
        });
    }

    for (code, word) in codes.iter().zip(raw.chunks_exact_mut(BYTES_PER_CHANNEL)) {
        let bits = (*code).clamp(CODE_MIN, CODE_MAX) as u32;
        word[0] = (bits >> 16) as u8;
        word[1] = (bits >> 8) as u8;
        word[2] = bits as u8;
    }
    Ok(())
}

/// Convert an output code to volts: full scale is +/-VREF
pub fn code_to_volts(code: i32, vref: f64) -> f64 {
    f64::from(code) * vref / f64::from(CODE_MAX + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_extension() {
        let mut raw = [0u8; FRAME_SIZE];
        raw[0..3].copy_from_slice(&[0x7F, 0xFF, 0xFF]);
        raw[3..6].copy_from_slice(&[0x80, 0x00, 0x00]);
        raw[6..9].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
        raw[9..12].copy_from_slice(&[0x00, 0x00, 0x01]);

        let codes = decode_frame(&raw).unwrap();
        assert_eq!(codes[0], CODE_MAX);
        assert_eq!(codes[1], CODE_MIN);
        assert_eq!(codes[2], -1);
        assert_eq!(codes[3], 1);
        assert_eq!(codes[4], 0);
    }

    #[test]
    fn test_wrong_length() {
        assert_eq!(
            decode_frame(&[0u8; 23]),
            Err(FrameError::Length {
                expected: 24,
                actual: 23
            })
        );
    }

    #[test]
    fn test_volts_full_scale() {
        let frame = ChannelFrame {
            sequence: 1,
            codes: [CODE_MAX, CODE_MIN, 0, 0, 0, 0, 0, 0],
        };
        let volts = frame.volts(2.5);
        assert!((volts[0] - 2.5).abs() < 1e-6);
        assert!((volts[1] + 2.5).abs() < 1e-12);
        assert_eq!(volts[2], 0.0);
    }

    proptest! {
        #[test]
        fn prop_codes_survive_framing(codes in prop::array::uniform8(CODE_MIN..=CODE_MAX)) {
            let mut raw = [0u8; FRAME_SIZE];
            encode_frame(&codes, &mut raw).unwrap();
            prop_assert_eq!(decode_frame(&raw).unwrap(), codes);
        }
    }
}
