//! Buffer Pool Implementation

use crate::{PoolError, QueueKind, SampleBuffer, SampleQueue};
use tracing::{debug, error, info};

/// Fixed pool of sample buffers split between a free and a ready queue.
///
/// Every buffer is allocated in [`BufferPool::new`] and never reallocated.
/// Both queues are sized to the whole pool, so returning a buffer can only
/// fail if the circulation invariant has been broken somewhere.
pub struct BufferPool {
    /// Buffers available for the next transfer
    free: SampleQueue,
    /// Buffers holding completed samples
    ready: SampleQueue,
    /// Number of buffers in the pool
    slot_count: usize,
    /// Payload size of every buffer
    sample_size: usize,
}

impl BufferPool {
    /// Allocate `slot_count` buffers of `sample_size` bytes, all free
    pub fn new(slot_count: usize, sample_size: usize) -> Result<Self, PoolError> {
        if slot_count == 0 {
            return Err(PoolError::InvalidConfig("pool needs at least one buffer".into()));
        }
        if sample_size == 0 {
            return Err(PoolError::InvalidConfig("sample size must be non-zero".into()));
        }

        let free = SampleQueue::new(QueueKind::Free, slot_count);
        let ready = SampleQueue::new(QueueKind::Ready, slot_count);

        for slot in 0..slot_count {
            // Capacity equals slot_count, the queue cannot be full here
            let _ = free.push(SampleBuffer::new(slot, sample_size));
        }

        info!("Buffer pool created: {} buffers x {} bytes", slot_count, sample_size);

        Ok(Self {
            free,
            ready,
            slot_count,
            sample_size,
        })
    }

    /// Free queue
    pub fn free(&self) -> &SampleQueue {
        &self.free
    }

    /// Ready queue
    pub fn ready(&self) -> &SampleQueue {
        &self.ready
    }

    /// Take a buffer for the next transfer
    pub fn acquire(&self) -> Option<SampleBuffer> {
        self.free.pop()
    }

    /// Take the oldest completed sample
    pub fn take_ready(&self) -> Option<SampleBuffer> {
        self.ready.pop()
    }

    /// Return a buffer to the free queue
    pub fn recycle(&self, buffer: SampleBuffer) -> Result<(), PoolError> {
        Self::put(&self.free, buffer)
    }

    /// Queue a completed sample for readers
    pub fn publish(&self, buffer: SampleBuffer) -> Result<(), PoolError> {
        Self::put(&self.ready, buffer)
    }

    fn put(queue: &SampleQueue, buffer: SampleBuffer) -> Result<(), PoolError> {
        queue.push(buffer).map_err(|rejected| {
            error!(
                "Buffer slot {} rejected by full {} queue, dropping it",
                rejected.slot(),
                queue.kind()
            );
            PoolError::CapacityViolation {
                queue: queue.kind(),
                slot: rejected.slot(),
            }
        })
    }

    /// Move every undelivered sample back to the free queue.
    ///
    /// Buffers owned by a transfer or a reader are untouched; their owner
    /// returns them when done. Returns the number of buffers moved.
    pub fn reset(&self) -> usize {
        let mut moved = 0;
        while let Some(buffer) = self.ready.pop() {
            if self.recycle(buffer).is_ok() {
                moved += 1;
            }
        }
        debug!("Pool reset: {} buffers returned to free queue", moved);
        moved
    }

    /// Number of buffers currently in either queue
    pub fn resident(&self) -> usize {
        self.free.len() + self.ready.len()
    }

    /// Number of buffers in the pool
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Payload size of every buffer
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("slot_count", &self.slot_count)
            .field("sample_size", &self.sample_size)
            .field("free", &self.free.len())
            .field("ready", &self.ready.len())
            .finish()
    }
}
