//! Transfer Completion Token

use crate::TransportError;
use sample_pool::SampleBuffer;
use std::sync::Arc;

/// Receiver of finished transfers.
///
/// Implementations run in whatever context the transport completes in and
/// must not block.
pub trait TransferCompletion: Send + Sync {
    /// A transfer finished; `buffer` is the one that was submitted
    fn transfer_complete(&self, status: Result<(), TransportError>, buffer: SampleBuffer);
}

/// Single-use completion callback handed to [`crate::BusTransport::submit`].
///
/// `complete` consumes the token, so a transfer cannot be completed twice.
/// Building one only bumps a reference count.
pub struct Completion {
    handler: Arc<dyn TransferCompletion>,
}

impl Completion {
    /// Bind a completion to its handler
    pub fn new(handler: Arc<dyn TransferCompletion>) -> Self {
        Self { handler }
    }

    /// Report the transfer outcome and hand the buffer back
    pub fn complete(self, status: Result<(), TransportError>, buffer: SampleBuffer) {
        self.handler.transfer_complete(status, buffer);
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}
