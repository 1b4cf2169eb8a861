//! Consumer Drain

use crate::engine::{Acquisition, Shared, NO_SEQUENCE};
use crate::stats::Counters;
use crate::{AcquisitionError, AcquisitionState, SampleSink, SliceSink};
use std::future::Future;
use std::sync::atomic::Ordering;
use tracing::{debug, trace, warn};

impl Shared {
    /// Copy up to `max` ready samples into `sink`, recycling each buffer
    /// as soon as it has been copied. Never blocks.
    pub(crate) fn drain_ready<S>(&self, sink: &mut S, max: usize) -> Result<usize, AcquisitionError>
    where
        S: SampleSink + ?Sized,
    {
        let mut delivered = 0;
        while delivered < max {
            let Some(buffer) = self.pool.take_ready() else {
                break;
            };

            let sequence = buffer.sequence();
            let result = sink.write_sample(sequence, buffer.payload());
            self.recycle(buffer);

            if let Err(source) = result {
                warn!("Copy-out failed after {} samples: {}", delivered, source);
                return Err(AcquisitionError::CopyFailed { delivered, source });
            }

            self.note_delivered(sequence);
            delivered += 1;
        }

        if delivered > 0 {
            debug!("Drained {} samples", delivered);
        }
        Ok(delivered)
    }

    fn note_delivered(&self, sequence: u32) {
        Counters::bump(&self.counters.delivered);

        let previous = self.last_delivered.swap(u64::from(sequence), Ordering::Relaxed);
        if previous == NO_SEQUENCE {
            return;
        }
        let gap = sequence.wrapping_sub(previous as u32).wrapping_sub(1);
        // Concurrent readers can deliver slightly out of order; ignore backwards steps
        if gap != 0 && gap < u32::MAX / 2 {
            trace!("Sequence gap of {} before sample {}", gap, sequence);
            self.counters
                .dropped_samples
                .fetch_add(u64::from(gap), Ordering::Relaxed);
        }
    }
}

impl Acquisition {
    /// Read whole sample records into `dst`.
    ///
    /// `dst.len()` must be a multiple of the sample size. Returns the number
    /// of records copied; 0 means acquisition is stopped and fully drained
    /// (or `dst` is empty). With `nonblocking` set an empty ready queue fails
    /// with `WouldBlock` instead of waiting.
    pub async fn read_into(&self, dst: &mut [u8], nonblocking: bool) -> Result<usize, AcquisitionError> {
        let sample_size = self.sample_size();
        if dst.len() % sample_size != 0 {
            return Err(AcquisitionError::InvalidArgument(format!(
                "read length {} is not a multiple of the {}-byte sample",
                dst.len(),
                sample_size
            )));
        }

        let max = dst.len() / sample_size;
        let mut sink = SliceSink::new(dst);
        self.read_until(&mut sink, max, nonblocking, std::future::pending()).await
    }

    /// Deliver up to `max_samples` samples to `sink`, waiting for data if
    /// none is ready. The wait ends with `Interrupted` when `cancel`
    /// resolves first; other readers are unaffected.
    pub async fn read_until<S, C>(
        &self,
        sink: &mut S,
        max_samples: usize,
        nonblocking: bool,
        cancel: C,
    ) -> Result<usize, AcquisitionError>
    where
        S: SampleSink + ?Sized,
        C: Future<Output = ()>,
    {
        if max_samples == 0 {
            return Ok(0);
        }

        let shared = self.shared();
        let max = max_samples.min(shared.pool.slot_count());
        tokio::pin!(cancel);

        loop {
            let notified = shared.data_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let delivered = shared.drain_ready(&mut *sink, max)?;
            if delivered > 0 {
                return Ok(delivered);
            }

            if shared.state.load() == AcquisitionState::Stopped {
                // Completions queue their sample before releasing the state,
                // so one more pass sees anything that landed meanwhile
                return shared.drain_ready(&mut *sink, max);
            }

            if nonblocking {
                return Err(AcquisitionError::WouldBlock);
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = &mut cancel => {
                    debug!("Read interrupted while waiting for samples");
                    return Err(AcquisitionError::Interrupted);
                }
            }
        }
    }
}
