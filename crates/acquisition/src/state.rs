//! Acquisition State Machine
//!
//! One atomic byte counts the reasons the engine is busy: one for an armed
//! timer and one for a transfer in flight. Every transition is a single
//! compare-and-swap or a decrement-if-nonzero, so the timer, transfer
//! completions and control calls never need a lock to agree on who may
//! submit.

use std::sync::atomic::{AtomicU8, Ordering};

/// Observable acquisition state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AcquisitionState {
    /// No timer, no transfer
    Stopped = 0,
    /// Timer running, no transfer outstanding
    Armed = 1,
    /// Exactly one transfer outstanding
    InFlight = 2,
}

impl AcquisitionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => AcquisitionState::Stopped,
            1 => AcquisitionState::Armed,
            // Only 0..=2 is ever stored
            _ => AcquisitionState::InFlight,
        }
    }
}

impl std::fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionState::Stopped => write!(f, "stopped"),
            AcquisitionState::Armed => write!(f, "armed"),
            AcquisitionState::InFlight => write!(f, "in-flight"),
        }
    }
}

/// Atomic cell holding an [`AcquisitionState`]
#[derive(Debug)]
pub(crate) struct StateCell {
    raw: AtomicU8,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            raw: AtomicU8::new(AcquisitionState::Stopped as u8),
        }
    }

    pub(crate) fn load(&self) -> AcquisitionState {
        AcquisitionState::from_raw(self.raw.load(Ordering::Acquire))
    }

    fn transition(&self, from: AcquisitionState, to: AcquisitionState) -> Result<(), AcquisitionState> {
        self.raw
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(AcquisitionState::from_raw)
    }

    /// STOPPED -> ARMED; on failure returns the state observed
    pub(crate) fn try_start(&self) -> Result<(), AcquisitionState> {
        self.transition(AcquisitionState::Stopped, AcquisitionState::Armed)
    }

    /// ARMED -> IN_FLIGHT; on failure returns the state observed
    pub(crate) fn try_claim(&self) -> Result<(), AcquisitionState> {
        self.transition(AcquisitionState::Armed, AcquisitionState::InFlight)
    }

    /// Decrement unless already stopped; returns the state before
    fn decrement(&self) -> Option<AcquisitionState> {
        self.raw
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| raw.checked_sub(1))
            .ok()
            .map(AcquisitionState::from_raw)
    }

    /// Stop's transition: ARMED -> STOPPED or IN_FLIGHT -> ARMED.
    /// Returns the state before, or `None` if already stopped.
    pub(crate) fn step_down(&self) -> Option<AcquisitionState> {
        self.decrement()
    }

    /// A transfer is over (completed or refused). Returns the state after,
    /// or `None` if the state was already stopped, which means a release
    /// without a matching claim.
    pub(crate) fn release(&self) -> Option<AcquisitionState> {
        self.decrement()
            .map(|before| AcquisitionState::from_raw(before as u8 - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_start_claim_release_cycle() {
        let cell = StateCell::new();
        assert_eq!(cell.load(), AcquisitionState::Stopped);

        cell.try_start().unwrap();
        assert_eq!(cell.try_start(), Err(AcquisitionState::Armed));

        cell.try_claim().unwrap();
        assert_eq!(cell.try_claim(), Err(AcquisitionState::InFlight));

        assert_eq!(cell.release(), Some(AcquisitionState::Armed));
        assert_eq!(cell.step_down(), Some(AcquisitionState::Armed));
        assert_eq!(cell.load(), AcquisitionState::Stopped);
    }

    #[test]
    fn test_stop_mid_flight_then_complete() {
        let cell = StateCell::new();
        cell.try_start().unwrap();
        cell.try_claim().unwrap();

        assert_eq!(cell.step_down(), Some(AcquisitionState::InFlight));
        assert_eq!(cell.load(), AcquisitionState::Armed);
        // A tick can no longer claim once stopped and drained
        assert_eq!(cell.release(), Some(AcquisitionState::Stopped));
        assert_eq!(cell.try_claim(), Err(AcquisitionState::Stopped));
    }

    #[test]
    fn test_step_down_when_stopped() {
        let cell = StateCell::new();
        assert_eq!(cell.step_down(), None);
        assert_eq!(cell.release(), None);
        assert_eq!(cell.load(), AcquisitionState::Stopped);
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::Arc;

        for _ in 0..100 {
            let cell = Arc::new(StateCell::new());
            cell.try_start().unwrap();
            let winners = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let cell = Arc::clone(&cell);
                    let winners = Arc::clone(&winners);
                    std::thread::spawn(move || {
                        if cell.try_claim().is_ok() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
            assert_eq!(cell.load(), AcquisitionState::InFlight);
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Start,
        Claim,
        StepDown,
        Release,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Start),
            Just(Op::Claim),
            Just(Op::StepDown),
            Just(Op::Release),
        ]
    }

    proptest! {
        // Calls follow the engine's discipline: only a running timer claims or
        // steps down, and only an outstanding claim is released.
        #[test]
        fn prop_state_counts_busy_reasons(ops in prop::collection::vec(op(), 0..200)) {
            let cell = StateCell::new();
            let mut timer = false;
            let mut claims = 0u8;

            for op in ops {
                match op {
                    Op::Start => {
                        let result = cell.try_start();
                        prop_assert_eq!(result.is_ok(), !timer && claims == 0);
                        if result.is_ok() {
                            timer = true;
                        }
                    }
                    Op::Claim if timer => {
                        let result = cell.try_claim();
                        prop_assert_eq!(result.is_ok(), claims == 0);
                        if result.is_ok() {
                            claims += 1;
                        }
                    }
                    Op::StepDown if timer => {
                        prop_assert!(cell.step_down().is_some());
                        timer = false;
                    }
                    Op::Release if claims > 0 => {
                        prop_assert!(cell.release().is_some());
                        claims -= 1;
                    }
                    _ => {}
                }

                let raw = cell.raw.load(Ordering::SeqCst);
                prop_assert!(raw <= 2);
                prop_assert!(claims <= 1);
                prop_assert_eq!(raw, u8::from(timer) + claims);
            }
        }
    }
}
