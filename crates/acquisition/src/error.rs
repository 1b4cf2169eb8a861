//! Acquisition Error Types

use bus_transport::TransportError;
use sample_pool::{PoolError, QueueKind};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by acquisition control and read operations
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// START while armed or with a transfer outstanding
    #[error("Acquisition already running")]
    AlreadyRunning,

    /// STOP while already stopped
    #[error("Acquisition not running")]
    NotRunning,

    /// Bad period, read length or configuration
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-blocking read with no sample ready
    #[error("No samples ready")]
    WouldBlock,

    /// Blocking read cancelled while waiting
    #[error("Wait for samples interrupted")]
    Interrupted,

    /// Bus reported a failed transfer.
    ///
    /// Recovered inside the engine (buffer back to Free, `transfer_errors`
    /// counted) and only used to log the failure; reads never return it.
    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransportError),

    /// A queue sized to the whole pool refused a buffer.
    ///
    /// The conversion target for `PoolError::CapacityViolation`. The engine
    /// drops the buffer and counts `capacity_violations` instead of failing
    /// the tick, completion or read that hit it.
    #[error("Buffer slot {slot} rejected by full {queue} queue")]
    CapacityViolation { queue: QueueKind, slot: usize },

    /// In-flight transfer never completed during detach
    #[error("In-flight transfer did not complete within {0:?}")]
    TeardownTimeout(Duration),

    /// Writing samples to the destination failed part way
    #[error("Copy-out failed after {delivered} samples: {source}")]
    CopyFailed {
        delivered: usize,
        #[source]
        source: std::io::Error,
    },

    /// Attach called outside a tokio runtime
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}

impl From<PoolError> for AcquisitionError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::InvalidConfig(msg) => AcquisitionError::InvalidArgument(msg),
            PoolError::CapacityViolation { queue, slot } => {
                AcquisitionError::CapacityViolation { queue, slot }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_convert() {
        let err = AcquisitionError::from(PoolError::CapacityViolation {
            queue: QueueKind::Ready,
            slot: 3,
        });
        assert!(matches!(
            err,
            AcquisitionError::CapacityViolation { queue: QueueKind::Ready, slot: 3 }
        ));
        assert!(err.to_string().contains("slot 3"));

        let err = AcquisitionError::from(PoolError::InvalidConfig("pool_size must be > 0".into()));
        assert!(matches!(err, AcquisitionError::InvalidArgument(_)));
    }

    #[test]
    fn test_transfer_failure_wraps_transport_error() {
        let err = AcquisitionError::from(TransportError::Timeout);
        assert!(matches!(err, AcquisitionError::TransferFailed(TransportError::Timeout)));
    }
}
