//! Acquisition Engine
//!
//! Owns the buffer pool, the state word and the timer task. Control calls
//! (`start`, `stop`, `set_period`, `detach`) run on the caller's context;
//! ticks run on the timer task and completions on whatever thread the
//! transport uses.

use crate::state::StateCell;
use crate::stats::Counters;
use crate::timer;
use crate::{AcquisitionConfig, AcquisitionError, AcquisitionState, AcquisitionStats};
use bus_transport::BusTransport;
use parking_lot::Mutex;
use sample_pool::{BufferPool, SampleBuffer};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Marker for "no sample delivered since start"
pub(crate) const NO_SEQUENCE: u64 = u64::MAX;

/// Where the pool's buffers are right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferCensus {
    /// Buffers waiting for a transfer
    pub free: usize,
    /// Buffers holding undelivered samples
    pub ready: usize,
    /// Buffers owned by the transport or a reader
    pub outstanding: usize,
}

/// Timer task handle guarded by the control path.
///
/// Ticks only `try_lock` this, so a tick never waits; control calls hold it
/// across their state transition so no tick can interleave with them.
pub(crate) struct TimerSlot {
    pub(crate) handle: Option<JoinHandle<()>>,
    pub(crate) generation: u64,
}

/// State shared between the engine handle, the timer task and completions
pub(crate) struct Shared {
    /// Sample buffers and their queues
    pub(crate) pool: BufferPool,
    /// Stopped / armed / in-flight
    pub(crate) state: StateCell,
    /// Diagnostic counters
    pub(crate) counters: Counters,
    /// Bus the samples are clocked from
    pub(crate) transport: Arc<dyn BusTransport>,
    /// Running timer task, if any
    pub(crate) timer: Mutex<TimerSlot>,
    /// Timer period in nanoseconds, read at every rearm
    period_ns: AtomicU64,
    /// Next sequence number to assign
    pub(crate) sequence: AtomicU32,
    /// Sequence of the last sample handed to a reader
    pub(crate) last_delivered: AtomicU64,
    /// Signalled when samples are queued or acquisition goes idle
    pub(crate) data_ready: Notify,
    /// Signalled when the state drops to stopped
    pub(crate) idle: Notify,
    /// Bound on the detach wait
    teardown_timeout: Duration,
}

impl Shared {
    pub(crate) fn period(&self) -> Duration {
        Duration::from_nanos(self.period_ns.load(Ordering::Relaxed))
    }

    /// Return a buffer to the free queue
    pub(crate) fn recycle(&self, buffer: SampleBuffer) {
        if self.pool.recycle(buffer).is_err() {
            Counters::bump(&self.counters.capacity_violations);
        }
    }

    /// Queue a completed sample; returns false if the buffer was dropped
    pub(crate) fn publish(&self, buffer: SampleBuffer) -> bool {
        if self.pool.publish(buffer).is_err() {
            Counters::bump(&self.counters.capacity_violations);
            return false;
        }
        true
    }

    /// Release the in-flight claim of a completed or refused transfer
    pub(crate) fn finish_transfer(&self) {
        match self.state.release() {
            Some(AcquisitionState::Stopped) => {
                debug!("Last transfer finished, acquisition idle");
                self.went_idle();
            }
            Some(_) => {}
            None => {
                error!("Transfer finished while acquisition already stopped");
            }
        }
    }

    fn went_idle(&self) {
        self.idle.notify_waiters();
        // Blocked readers need to see end-of-data
        self.data_ready.notify_waiters();
    }

    /// Cancel the timer and step the state down. Returns the state before,
    /// or `None` if no timer was running.
    fn halt_timer(&self) -> Option<AcquisitionState> {
        let mut slot = self.timer.lock();
        let handle = slot.handle.take()?;

        let before = self.state.step_down();
        handle.abort();

        match before {
            Some(AcquisitionState::Armed) => self.went_idle(),
            Some(_) => {}
            None => error!("Timer was running while acquisition was stopped"),
        }
        Some(before.unwrap_or(AcquisitionState::Stopped))
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.load() == AcquisitionState::Stopped {
                return;
            }
            notified.await;
        }
    }
}

/// Periodic acquisition engine for one converter.
///
/// Constructed once per device attach and torn down with
/// [`Acquisition::detach`].
pub struct Acquisition {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl Acquisition {
    /// Build the buffer pool and bind the engine to the current tokio runtime
    pub fn attach(
        config: AcquisitionConfig,
        transport: Arc<dyn BusTransport>,
    ) -> Result<Self, AcquisitionError> {
        let runtime =
            Handle::try_current().map_err(|e| AcquisitionError::NoRuntime(e.to_string()))?;
        Self::attach_with_handle(config, transport, runtime)
    }

    /// Build the engine on an explicit runtime
    pub fn attach_with_handle(
        config: AcquisitionConfig,
        transport: Arc<dyn BusTransport>,
        runtime: Handle,
    ) -> Result<Self, AcquisitionError> {
        config.validate()?;
        let pool = BufferPool::new(config.pool_size, config.sample_size)?;

        info!(
            "Acquisition attached: {} buffers x {} bytes, period {:?}, transport {}",
            config.pool_size,
            config.sample_size,
            config.period(),
            transport.name()
        );

        let shared = Arc::new(Shared {
            pool,
            state: StateCell::new(),
            counters: Counters::default(),
            transport,
            timer: Mutex::new(TimerSlot {
                handle: None,
                generation: 0,
            }),
            period_ns: AtomicU64::new(config.period_ns),
            sequence: AtomicU32::new(1),
            last_delivered: AtomicU64::new(NO_SEQUENCE),
            data_ready: Notify::new(),
            idle: Notify::new(),
            teardown_timeout: config.teardown_timeout(),
        });

        Ok(Self { shared, runtime })
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Arm the periodic timer.
    ///
    /// Fails with `AlreadyRunning` (and touches nothing) unless fully
    /// stopped, including the wait for a transfer left over from the last
    /// run.
    pub fn start(&self) -> Result<(), AcquisitionError> {
        let mut slot = self.shared.timer.lock();

        if let Err(observed) = self.shared.state.try_start() {
            warn!("Start refused: acquisition is {}", observed);
            return Err(AcquisitionError::AlreadyRunning);
        }

        let returned = self.shared.pool.reset();
        self.shared.sequence.store(1, Ordering::Relaxed);
        self.shared.last_delivered.store(NO_SEQUENCE, Ordering::Relaxed);

        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        slot.handle = Some(
            self.runtime
                .spawn(timer::run(Arc::clone(&self.shared), generation)),
        );

        info!(
            "Acquisition started: period {:?}, {} stale samples discarded",
            self.shared.period(),
            returned
        );
        Ok(())
    }

    /// Cancel the timer. A transfer already in flight completes normally.
    pub fn stop(&self) -> Result<(), AcquisitionError> {
        match self.shared.halt_timer() {
            Some(before) => {
                info!("Acquisition stopped (was {})", before);
                Ok(())
            }
            None => {
                debug!("Stop refused: acquisition not running");
                Err(AcquisitionError::NotRunning)
            }
        }
    }

    /// Change the timer period; takes effect at the next rearm
    pub fn set_period(&self, period: Duration) -> Result<(), AcquisitionError> {
        if period.is_zero() {
            return Err(AcquisitionError::InvalidArgument("period must be positive".into()));
        }
        let nanos = u64::try_from(period.as_nanos()).map_err(|_| {
            AcquisitionError::InvalidArgument(format!("period {:?} is too long", period))
        })?;

        self.shared.period_ns.store(nanos, Ordering::Relaxed);
        info!("Acquisition period set to {:?}", period);
        Ok(())
    }

    /// Current timer period
    pub fn period(&self) -> Duration {
        self.shared.period()
    }

    /// Current state
    pub fn state(&self) -> AcquisitionState {
        self.shared.state.load()
    }

    /// Counter snapshot
    pub fn stats(&self) -> AcquisitionStats {
        self.shared.counters.snapshot()
    }

    /// Buffer locations snapshot
    pub fn census(&self) -> BufferCensus {
        let free = self.shared.pool.free().len();
        let ready = self.shared.pool.ready().len();
        BufferCensus {
            free,
            ready,
            outstanding: self.shared.pool.slot_count().saturating_sub(free + ready),
        }
    }

    /// True when at least one sample is ready
    pub fn has_data(&self) -> bool {
        !self.shared.pool.ready().is_empty()
    }

    /// Bytes per sample record
    pub fn sample_size(&self) -> usize {
        self.shared.pool.sample_size()
    }

    /// Number of buffers in the pool
    pub fn pool_size(&self) -> usize {
        self.shared.pool.slot_count()
    }

    /// Tear the engine down.
    ///
    /// Cancels the timer, then waits up to the configured bound for a
    /// transfer still in flight. On timeout the engine is released anyway
    /// and `TeardownTimeout` is returned; the transport still owns the
    /// buffer it was given.
    pub async fn detach(self) -> Result<AcquisitionStats, AcquisitionError> {
        if let Some(before) = self.shared.halt_timer() {
            info!("Timer cancelled during detach (was {})", before);
        }

        let limit = self.shared.teardown_timeout;
        let outcome = tokio::time::timeout(limit, self.shared.wait_idle()).await;

        let stats = self.stats();
        info!("Acquisition statistics: {}", stats);

        match outcome {
            Ok(()) => {
                info!("Acquisition detached");
                Ok(stats)
            }
            Err(_) => {
                error!(
                    "Transfer still in flight after {:?}, {} did not complete it",
                    limit,
                    self.shared.transport.name()
                );
                Err(AcquisitionError::TeardownTimeout(limit))
            }
        }
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        if let Some(handle) = self.shared.timer.lock().handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Acquisition")
            .field("state", &self.state())
            .field("period", &self.period())
            .field("pool", &self.shared.pool)
            .finish()
    }
}
