//! Mock Transport for running without hardware

use crate::ads1271::{self, CHANNELS, FRAME_SIZE};
use crate::{BusTransport, Completion, Rejected, TransportError};
use parking_lot::Mutex;
use sample_pool::SampleBuffer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info};

/// How the mock transport treats submissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockBehavior {
    /// Delay between submission and completion
    pub latency_us: u64,
    /// Fail every n-th transfer with a bus error (0 = never)
    pub fail_every: u64,
    /// Refuse every submission synchronously
    pub reject: bool,
    /// Accept submissions but never complete them
    pub hang: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            latency_us: 100,
            fail_every: 0,
            reject: false,
            hang: false,
        }
    }
}

impl MockBehavior {
    /// Complete every transfer successfully after `latency`
    pub fn completing(latency: Duration) -> Self {
        Self {
            latency_us: latency.as_micros() as u64,
            ..Default::default()
        }
    }

    /// Never complete (simulates a wedged controller)
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Default::default()
        }
    }

    /// Refuse every submission
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    /// Complete after `latency`, failing every `every`-th transfer
    pub fn failing_every(every: u64, latency: Duration) -> Self {
        Self {
            latency_us: latency.as_micros() as u64,
            fail_every: every,
            ..Default::default()
        }
    }

    fn latency(&self) -> Duration {
        Duration::from_micros(self.latency_us)
    }
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Transport that completes transfers on the tokio runtime with synthetic
/// converter data
pub struct MockTransport {
    /// Configured behavior
    behavior: MockBehavior,
    /// Runtime used to schedule completions
    runtime: Handle,
    /// Transfer statistics, shared with in-flight completions
    counters: Arc<Counters>,
    /// Completions withheld in hang mode. A completion usually keeps its
    /// handler alive, and the handler may own this transport, so the list
    /// forms a cycle until `release_held` or `close` empties it.
    held: Mutex<Vec<(Completion, SampleBuffer)>>,
}

impl MockTransport {
    /// Create a mock transport on the current tokio runtime
    pub fn new(behavior: MockBehavior) -> Result<Self, TransportError> {
        let runtime = Handle::try_current()
            .map_err(|e| TransportError::Bus(format!("no tokio runtime: {}", e)))?;
        Ok(Self::with_handle(behavior, runtime))
    }

    /// Create a mock transport completing on the given runtime
    pub fn with_handle(behavior: MockBehavior, runtime: Handle) -> Self {
        info!("Creating mock SPI transport: {:?}", behavior);
        Self {
            behavior,
            runtime,
            counters: Arc::new(Counters::default()),
            held: Mutex::new(Vec::new()),
        }
    }

    /// Transfers accepted so far
    pub fn submitted(&self) -> u64 {
        self.counters.submitted.load(Ordering::Relaxed)
    }

    /// Completions delivered so far (successful or failed)
    pub fn completed(&self) -> u64 {
        self.counters.completed.load(Ordering::Relaxed)
    }

    /// Completions delivered with an error status
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Transfers withheld in hang mode
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Deliver every withheld completion with `status`
    pub fn release_held(&self, status: Result<(), TransportError>) -> usize {
        let held: Vec<_> = self.held.lock().drain(..).collect();
        let count = held.len();
        for (completion, buffer) in held {
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
            if status.is_err() {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            completion.complete(status.clone(), buffer);
        }
        debug!("Released {} held transfers", count);
        count
    }

    /// Drop every withheld transfer without completing it, as a bus that
    /// went away would. Returns how many were discarded.
    pub fn close(&self) -> usize {
        let held: Vec<_> = self.held.lock().drain(..).collect();
        if !held.is_empty() {
            info!("Mock transport closed with {} transfers never completed", held.len());
        }
        held.len()
    }
}

impl BusTransport for MockTransport {
    fn submit(&self, mut buffer: SampleBuffer, completion: Completion) -> Result<(), Rejected> {
        if self.behavior.reject {
            return Err(Rejected::new(TransportError::Busy, buffer));
        }

        let nth = self.counters.submitted.fetch_add(1, Ordering::Relaxed) + 1;

        if self.behavior.hang {
            self.held.lock().push((completion, buffer));
            return Ok(());
        }

        let latency = self.behavior.latency();
        let fail = self.behavior.fail_every != 0 && nth % self.behavior.fail_every == 0;
        let counters = Arc::clone(&self.counters);

        self.runtime.spawn(async move {
            tokio::time::sleep(latency).await;

            let status = if fail {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                Err(TransportError::Bus("mock CRC error".into()))
            } else {
                fill_synthetic(&mut buffer);
                Ok(())
            };
            counters.completed.fetch_add(1, Ordering::Relaxed);
            completion.complete(status, buffer);
        });

        Ok(())
    }

    fn name(&self) -> &str {
        "mock-spi"
    }
}

/// Fill a buffer with deterministic pseudo-random data derived from its
/// sequence number
fn fill_synthetic(buffer: &mut SampleBuffer) {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let sequence = buffer.sequence();
    let payload = buffer.payload_mut();

    if payload.len() == FRAME_SIZE {
        let mut codes = [0i32; CHANNELS];
        for (channel, code) in codes.iter_mut().enumerate() {
            let mut hasher = DefaultHasher::new();
            sequence.hash(&mut hasher);
            channel.hash(&mut hasher);
            // Keep the mock signal within +/-1/8 of full scale
            *code = (hasher.finish() % 0x20_0000) as i32 - 0x10_0000;
        }
        let _ = ads1271::encode_frame(&codes, payload);
        return;
    }

    for (i, byte) in payload.iter_mut().enumerate() {
        let mut hasher = DefaultHasher::new();
        sequence.hash(&mut hasher);
        i.hash(&mut hasher);
        *byte = hasher.finish() as u8;
    }
}
