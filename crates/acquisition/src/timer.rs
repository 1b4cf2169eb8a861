//! Timer-Driven Submitter

use crate::engine::Shared;
use crate::stats::Counters;
use crate::AcquisitionState;
use bus_transport::{Completion, Rejected};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, error, trace, warn};

/// Whether the timer should keep firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    Halt,
}

/// Timer task body. Each rearm is one period from now, so a stalled tick
/// never produces a burst of catch-up ticks.
pub(crate) async fn run(shared: Arc<Shared>, generation: u64) {
    debug!("Timer task {} running", generation);
    loop {
        tokio::time::sleep_until(Instant::now() + shared.period()).await;
        if shared.on_timer(generation) == TickOutcome::Halt {
            break;
        }
    }
    debug!("Timer task {} finished", generation);
}

impl Shared {
    /// Timer expiry: run one tick unless a control call holds the gate
    pub(crate) fn on_timer(self: &Arc<Self>, generation: u64) -> TickOutcome {
        let Some(slot) = self.timer.try_lock() else {
            Counters::bump(&self.counters.ticks);
            trace!("Control call in progress, tick skipped");
            return TickOutcome::Continue;
        };
        if slot.generation != generation || slot.handle.is_none() {
            return TickOutcome::Halt;
        }
        self.tick()
    }

    /// One submission attempt. Never blocks.
    pub(crate) fn tick(self: &Arc<Self>) -> TickOutcome {
        Counters::bump(&self.counters.ticks);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        if self.pool.free().is_empty() {
            Counters::bump(&self.counters.overruns);
            debug!("Tick {}: no free buffer, overrun", sequence);
            return TickOutcome::Continue;
        }

        match self.state.try_claim() {
            Ok(()) => {}
            Err(AcquisitionState::InFlight) => {
                Counters::bump(&self.counters.uncompleted);
                debug!("Tick {}: previous transfer still outstanding", sequence);
                return TickOutcome::Continue;
            }
            Err(observed) => {
                debug!("Tick {}: acquisition {}, not submitting", sequence, observed);
                return TickOutcome::Halt;
            }
        }

        // The tick is the only consumer of the free queue
        let Some(mut buffer) = self.pool.acquire() else {
            Counters::bump(&self.counters.capacity_violations);
            error!("Tick {}: free queue emptied between peek and take", sequence);
            self.finish_transfer();
            return TickOutcome::Continue;
        };

        buffer.set_sequence(sequence);
        let slot = buffer.slot();

        match self.transport.submit(buffer, Completion::new(self.clone())) {
            Ok(()) => {
                trace!("Tick {}: slot {} submitted", sequence, slot);
            }
            Err(Rejected { error, buffer }) => {
                Counters::bump(&self.counters.failed_submissions);
                warn!(
                    "Tick {}: {} refused slot {}: {}",
                    sequence,
                    self.transport.name(),
                    slot,
                    error
                );
                self.recycle(buffer);
                self.finish_transfer();
            }
        }
        TickOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Acquisition, AcquisitionConfig};
    use bus_transport::{MockBehavior, MockTransport};
    use std::time::Duration;

    fn attach() -> (Acquisition, Arc<MockTransport>) {
        let transport =
            Arc::new(MockTransport::new(MockBehavior::completing(Duration::from_millis(1))).unwrap());
        let acq = Acquisition::attach(
            AcquisitionConfig {
                pool_size: 4,
                period_ns: 10_000_000,
                ..Default::default()
            },
            transport.clone(),
        )
        .unwrap();
        (acq, transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skipped_by_control_call_still_counts() {
        let (acq, transport) = attach();
        acq.start().unwrap();
        let shared = acq.shared();
        let generation = shared.timer.lock().generation;

        {
            let _gate = shared.timer.lock();
            assert_eq!(shared.on_timer(generation), TickOutcome::Continue);
        }

        let stats = acq.stats();
        assert_eq!(stats.ticks, 1);
        assert_eq!(transport.submitted(), 0);
        assert_eq!(acq.state(), AcquisitionState::Armed);
        acq.stop().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_halts() {
        let (acq, transport) = attach();
        acq.start().unwrap();
        let shared = acq.shared();
        let generation = shared.timer.lock().generation;

        assert_eq!(shared.on_timer(generation.wrapping_sub(1)), TickOutcome::Halt);
        assert_eq!(shared.on_timer(generation), TickOutcome::Continue);
        assert_eq!(transport.submitted(), 1);
        acq.stop().unwrap();
    }
}
