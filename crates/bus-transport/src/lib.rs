//! Bus Transport
//!
//! This crate defines how the acquisition core talks to the serial bus: a
//! buffer is handed to a [`BusTransport`] together with a single-use
//! [`Completion`], and the transport later gives the buffer back through that
//! completion with the transfer status. It also carries the SPI settings and
//! frame layout of the TI ADS1271 daisy chain, plus a mock transport for
//! running without hardware.

pub mod ads1271;
mod completion;
mod error;
mod mock;
mod settings;

pub use completion::{Completion, TransferCompletion};
pub use error::{Rejected, TransportError};
pub use mock::{MockBehavior, MockTransport};
pub use settings::{SpiMode, SpiSettings};

use sample_pool::SampleBuffer;

/// Asynchronous transfer engine for one converter on the bus.
///
/// `submit` must not block: it either accepts the transfer, taking ownership
/// of the buffer until `completion` is invoked, or rejects it immediately and
/// hands the buffer back. An accepted submission is completed exactly once,
/// from any thread.
pub trait BusTransport: Send + Sync {
    /// Start a transfer that fills `buffer`'s payload
    fn submit(&self, buffer: SampleBuffer, completion: Completion) -> Result<(), Rejected>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "bus"
    }
}
