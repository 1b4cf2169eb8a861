//! Sample Buffer

/// One slot of the buffer pool.
///
/// A `SampleBuffer` is deliberately neither `Clone` nor `Copy`: at any
/// instant it has exactly one owner (a queue, the bus transport, or a reader
/// copying it out).
#[derive(Debug)]
pub struct SampleBuffer {
    /// Slot index inside the pool
    slot: usize,
    /// Sequence number assigned when the buffer was submitted
    sequence: u32,
    /// Fixed-size payload written by the converter
    payload: Box<[u8]>,
}

impl SampleBuffer {
    pub(crate) fn new(slot: usize, sample_size: usize) -> Self {
        Self {
            slot,
            sequence: 0,
            payload: vec![0u8; sample_size].into_boxed_slice(),
        }
    }

    /// Slot index of this buffer inside its pool
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Sequence number of the sample currently held
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Tag the buffer with the sequence number of the transfer that fills it
    pub fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }

    /// Sample payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Mutable payload, used by the transport as the transfer destination
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.payload
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True for a zero-length payload (never produced by a valid pool)
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_zeroed() {
        let buffer = SampleBuffer::new(3, 24);
        assert_eq!(buffer.slot(), 3);
        assert_eq!(buffer.sequence(), 0);
        assert_eq!(buffer.len(), 24);
        assert!(buffer.payload().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_payload_write() {
        let mut buffer = SampleBuffer::new(0, 4);
        buffer.payload_mut().copy_from_slice(&[1, 2, 3, 4]);
        buffer.set_sequence(77);
        assert_eq!(buffer.payload(), &[1, 2, 3, 4]);
        assert_eq!(buffer.sequence(), 77);
    }
}
