//! Transfer Completion Handler

use crate::engine::Shared;
use crate::stats::Counters;
use crate::AcquisitionError;
use bus_transport::{TransferCompletion, TransportError};
use sample_pool::SampleBuffer;
use tracing::{debug, trace};

impl TransferCompletion for Shared {
    /// Runs on the transport's completion context; lock-free throughout.
    ///
    /// The buffer is queued before the in-flight claim is released, so a
    /// reader that observes `Stopped` also observes the last sample.
    fn transfer_complete(&self, status: Result<(), TransportError>, buffer: SampleBuffer) {
        let slot = buffer.slot();
        let sequence = buffer.sequence();

        match status {
            Ok(()) => {
                if self.publish(buffer) {
                    trace!("Transfer {} complete on slot {}", sequence, slot);
                }
            }
            Err(error) => {
                Counters::bump(&self.counters.uncompleted);
                Counters::bump(&self.counters.transfer_errors);
                debug!(
                    "Slot {} returned to free queue: {}",
                    slot,
                    AcquisitionError::TransferFailed(error)
                );
                self.recycle(buffer);
            }
        }

        self.data_ready.notify_waiters();
        self.finish_transfer();
    }
}
