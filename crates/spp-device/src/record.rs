//! Output Records

use bus_transport::ads1271::{ChannelFrame, CHANNELS};
use serde::Serialize;

/// One frame as printed by the runner: raw codes plus channel voltages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub sequence: u32,
    pub codes: [i32; CHANNELS],
    pub volts: [f64; CHANNELS],
}

impl FrameRecord {
    /// Scale a decoded frame against the reference voltage `vref`
    pub fn new(frame: &ChannelFrame, vref: f64) -> Self {
        Self {
            sequence: frame.sequence,
            codes: frame.codes,
            volts: frame.volts(vref),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bus_transport::ads1271::{CODE_MAX, CODE_MIN};

    #[test]
    fn test_record_scales_codes() {
        let frame = ChannelFrame {
            sequence: 7,
            codes: [0, CODE_MAX, CODE_MIN, 0, 0, 0, 0, 0],
        };
        let record = FrameRecord::new(&frame, 2.5);

        assert_eq!(record.sequence, 7);
        assert_eq!(record.codes, frame.codes);
        assert_eq!(record.volts[0], 0.0);
        assert!((record.volts[1] - 2.5).abs() < 1e-5);
        assert!((record.volts[2] + 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_record_json_shape() {
        let frame = ChannelFrame {
            sequence: 1,
            codes: [0; CHANNELS],
        };
        let json = serde_json::to_value(FrameRecord::new(&frame, 2.5)).unwrap();
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["codes"].as_array().unwrap().len(), CHANNELS);
        assert_eq!(json["volts"].as_array().unwrap().len(), CHANNELS);
    }
}
