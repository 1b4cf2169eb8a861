//! SPI Bus Settings

use crate::TransportError;
use serde::{Deserialize, Serialize};

/// Clock polarity/phase combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    Mode0,
    /// CPOL=0, CPHA=1 (ADS1271 latches on the falling edge)
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Clock idles high
    pub fn cpol(&self) -> bool {
        matches!(self, SpiMode::Mode2 | SpiMode::Mode3)
    }

    /// Data sampled on the second clock edge
    pub fn cpha(&self) -> bool {
        matches!(self, SpiMode::Mode1 | SpiMode::Mode3)
    }

    /// Mode number as used by spidev
    pub fn bits(&self) -> u8 {
        ((self.cpol() as u8) << 1) | self.cpha() as u8
    }
}

impl Default for SpiMode {
    fn default() -> Self {
        SpiMode::Mode1
    }
}

/// Bus parameters for the converter's chip select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiSettings {
    /// Controller bus number the converter is wired to
    pub bus: u16,
    /// Chip select line
    pub chip_select: u8,
    /// Maximum SCLK rate in Hz
    pub max_speed_hz: u32,
    /// Word size
    pub bits_per_word: u8,
    /// Clock mode
    pub mode: SpiMode,
}

impl Default for SpiSettings {
    fn default() -> Self {
        Self {
            bus: 2,
            chip_select: 0,
            max_speed_hz: 24_000_000,
            bits_per_word: 8,
            mode: SpiMode::Mode1,
        }
    }
}

impl SpiSettings {
    /// Upper SCLK limit of the ADS1271 serial interface
    pub const MAX_SCLK_HZ: u32 = 27_000_000;

    /// Check the settings against what the converter supports
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.max_speed_hz == 0 || self.max_speed_hz > Self::MAX_SCLK_HZ {
            return Err(TransportError::InvalidSettings(format!(
                "clock {} Hz outside 1..={} Hz",
                self.max_speed_hz,
                Self::MAX_SCLK_HZ
            )));
        }
        if self.bits_per_word == 0 || self.bits_per_word > 32 {
            return Err(TransportError::InvalidSettings(format!(
                "unsupported word size {}",
                self.bits_per_word
            )));
        }
        Ok(())
    }

    /// Time to clock `bytes` bytes at the configured rate, saturating at
    /// `Duration::MAX`
    pub fn transfer_time(&self, bytes: usize) -> std::time::Duration {
        let bits = bytes as u128 * 8;
        let hz = u128::from(self.max_speed_hz.max(1));
        let nanos = bits * 1_000_000_000 / hz;
        let secs = nanos / 1_000_000_000;
        match u64::try_from(secs) {
            Ok(secs) => std::time::Duration::new(secs, (nanos % 1_000_000_000) as u32),
            Err(_) => std::time::Duration::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = SpiSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.mode.bits(), 1);
        assert_eq!(settings.bus, 2);
    }

    #[test]
    fn test_mode_bits() {
        assert_eq!(SpiMode::Mode0.bits(), 0);
        assert_eq!(SpiMode::Mode2.bits(), 2);
        assert_eq!(SpiMode::Mode3.bits(), 3);
    }

    #[test]
    fn test_rejects_overclock() {
        let settings = SpiSettings {
            max_speed_hz: 50_000_000,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(TransportError::InvalidSettings(_))));
    }

    #[test]
    fn test_transfer_time() {
        let settings = SpiSettings {
            max_speed_hz: 8_000_000,
            ..Default::default()
        };
        // 24 bytes = 192 bits at 8 MHz
        assert_eq!(settings.transfer_time(24).as_nanos(), 24_000);
    }

    #[test]
    fn test_transfer_time_saturates() {
        let slow = SpiSettings {
            max_speed_hz: 1,
            ..Default::default()
        };
        // Far past a u64 nanosecond count
        if usize::BITS == 64 {
            assert_eq!(slow.transfer_time(usize::MAX), std::time::Duration::MAX);
        }
        assert_eq!(
            slow.transfer_time(1 << 30),
            std::time::Duration::from_secs(1 << 33)
        );
        assert_eq!(slow.transfer_time(3), std::time::Duration::from_secs(24));
    }
}
