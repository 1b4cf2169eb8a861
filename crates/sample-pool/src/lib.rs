//! Sample Buffer Pool
//!
//! A fixed arena of pre-allocated sample buffers that circulate between a
//! free queue and a ready queue. Buffers are move-only values: owning one
//! is the right to read or write its payload, and handing it to a queue (or
//! to a bus transfer) gives that right away.

mod buffer;
mod pool;
mod queue;

pub use buffer::SampleBuffer;
pub use pool::BufferPool;
pub use queue::SampleQueue;

use thiserror::Error;

/// Default number of buffers in the pool
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Default size of one sample record in bytes (8 channels x 24-bit)
pub const DEFAULT_SAMPLE_SIZE: usize = 24;

/// Which of the two circulating queues an operation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    /// Buffers available for the next transfer
    Free,
    /// Buffers holding completed, undelivered samples
    Ready,
}

impl std::fmt::Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueKind::Free => write!(f, "free"),
            QueueKind::Ready => write!(f, "ready"),
        }
    }
}

/// Errors raised by the buffer pool
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Pool dimensions are unusable
    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// A queue sized to the whole pool refused a buffer
    #[error("{queue} queue full while returning buffer slot {slot}")]
    CapacityViolation { queue: QueueKind, slot: usize },
}
