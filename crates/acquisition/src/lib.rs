//! Periodic Sample Acquisition
//!
//! A timer fires every period and submits one SPI transfer into a free pool
//! buffer; the transfer completion queues the filled buffer for readers; a
//! reader copies samples out and recycles the buffers. A single atomic state
//! word guarantees at most one transfer in flight and no submission after
//! stop, and teardown waits (bounded) for the last transfer to come back.

mod completion;
mod config;
mod drain;
mod engine;
mod error;
mod sink;
mod state;
mod stats;
mod timer;

pub use config::{period_from_parts, AcquisitionConfig};
pub use engine::{Acquisition, BufferCensus};
pub use error::AcquisitionError;
pub use sink::{FnSink, SampleSink, SliceSink, WriterSink};
pub use state::AcquisitionState;
pub use stats::AcquisitionStats;
