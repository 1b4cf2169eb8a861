//! Device Error Types

use acquisition::AcquisitionError;
use bus_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the device endpoint
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Control or read failure from the acquisition engine
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    /// Bus settings or transport setup failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Unknown control code or malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The device only produces data
    #[error("Device is read-only")]
    ReadOnly,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl DeviceError {
    /// True for failures caused by the caller's arguments
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            DeviceError::InvalidArgument(_)
                | DeviceError::Acquisition(AcquisitionError::InvalidArgument(_))
        )
    }

    /// True when a non-blocking read found nothing ready
    pub fn is_would_block(&self) -> bool {
        matches!(self, DeviceError::Acquisition(AcquisitionError::WouldBlock))
    }
}
