//! Lock-Free Sample Queue

use crate::{QueueKind, SampleBuffer};
use crossbeam_queue::ArrayQueue;

/// Bounded MPMC FIFO of sample buffers.
///
/// Push and pop are lock-free, so the queue may be touched from the timer
/// task, from a transfer completion running on a transport thread and from a
/// reader at the same time.
pub struct SampleQueue {
    /// Which role this queue plays in the pool
    kind: QueueKind,
    /// Backing lock-free ring
    inner: ArrayQueue<SampleBuffer>,
}

impl SampleQueue {
    /// Create an empty queue holding at most `capacity` buffers
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(kind: QueueKind, capacity: usize) -> Self {
        Self {
            kind,
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Role of this queue
    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    /// Append a buffer, handing it back if the queue is full
    pub fn push(&self, buffer: SampleBuffer) -> Result<(), SampleBuffer> {
        self.inner.push(buffer)
    }

    /// Remove the oldest buffer
    pub fn pop(&self) -> Option<SampleBuffer> {
        self.inner.pop()
    }

    /// Number of buffers currently queued
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the queue holds no buffers
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Check if the queue is at capacity
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Maximum number of buffers
    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl std::fmt::Debug for SampleQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleQueue")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
