//! Acquisition Statistics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the acquisition counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionStats {
    /// Timer callbacks run
    pub ticks: u64,
    /// Ticks that found no free buffer
    pub overruns: u64,
    /// Ticks that found a transfer still outstanding, plus failed transfers
    pub uncompleted: u64,
    /// Submissions the transport refused
    pub failed_submissions: u64,
    /// Transfers completed with an error status
    pub transfer_errors: u64,
    /// Buffers dropped because a queue was unexpectedly full
    pub capacity_violations: u64,
    /// Samples handed to readers
    pub delivered: u64,
    /// Sequence numbers missing between consecutively delivered samples
    pub dropped_samples: u64,
}

/// Live counters, updated with relaxed atomics from any context
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) ticks: AtomicU64,
    pub(crate) overruns: AtomicU64,
    pub(crate) uncompleted: AtomicU64,
    pub(crate) failed_submissions: AtomicU64,
    pub(crate) transfer_errors: AtomicU64,
    pub(crate) capacity_violations: AtomicU64,
    pub(crate) delivered: AtomicU64,
    pub(crate) dropped_samples: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> AcquisitionStats {
        AcquisitionStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            uncompleted: self.uncompleted.load(Ordering::Relaxed),
            failed_submissions: self.failed_submissions.load(Ordering::Relaxed),
            transfer_errors: self.transfer_errors.load(Ordering::Relaxed),
            capacity_violations: self.capacity_violations.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped_samples: self.dropped_samples.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for AcquisitionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} overruns={} uncompleted={} failed_submissions={} transfer_errors={} \
             capacity_violations={} delivered={} dropped_samples={}",
            self.ticks,
            self.overruns,
            self.uncompleted,
            self.failed_submissions,
            self.transfer_errors,
            self.capacity_violations,
            self.delivered,
            self.dropped_samples
        )
    }
}
