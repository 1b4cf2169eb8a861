//! Transport Error Types

use sample_pool::SampleBuffer;
use thiserror::Error;

/// Errors reported by a bus transfer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Controller queue cannot take another message
    #[error("SPI controller busy")]
    Busy,

    /// Transfer failed on the wire
    #[error("SPI bus error: {0}")]
    Bus(String),

    /// Controller did not finish the transfer in time
    #[error("SPI transfer timed out")]
    Timeout,

    /// Transport has been shut down
    #[error("Transport closed")]
    Closed,

    /// Bus settings the controller cannot use
    #[error("Invalid SPI settings: {0}")]
    InvalidSettings(String),
}

/// A submission refused synchronously; the buffer goes back to the caller
#[derive(Debug)]
pub struct Rejected {
    /// Why the transfer was refused
    pub error: TransportError,
    /// The buffer that was offered
    pub buffer: SampleBuffer,
}

impl Rejected {
    /// Wrap a refused buffer
    pub fn new(error: TransportError, buffer: SampleBuffer) -> Self {
        Self { error, buffer }
    }
}

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submission of slot {} rejected: {}", self.buffer.slot(), self.error)
    }
}
