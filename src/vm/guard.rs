// src/vm/guard.rs

//! Cooperative termination for running scripts.

use crate::core::ChshError;
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

const RUNNING: u8 = 0;
const TIMED_OUT: u8 = 1;
const CANCELLED: u8 = 2;

/// Steps between clock reads.
const CLOCK_INTERVAL: u32 = 64;

#[derive(Debug)]
struct GuardState {
    abort: AtomicU8,
    deadline: Option<Instant>,
    timeout_millis: u64,
}

/// Checked by the interpreter at every statement, loop iteration and call.
///
/// The guard trips when its deadline passes or when a [`GuardHandle`] aborts
/// it from another thread. Once tripped it stays tripped.
#[derive(Debug)]
pub struct ExecutionGuard {
    state: Arc<GuardState>,
    ticks: Cell<u32>,
}

/// Lets another thread stop the script a guard protects.
#[derive(Debug, Clone)]
pub struct GuardHandle(Arc<GuardState>);

impl ExecutionGuard {
    /// A guard whose deadline is `timeout` from now. `None` never times out.
    pub fn new(timeout: Option<Duration>) -> Self {
        let state = GuardState {
            abort: AtomicU8::new(RUNNING),
            deadline: timeout.map(|t| Instant::now() + t),
            timeout_millis: timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        };
        Self { state: Arc::new(state), ticks: Cell::new(0) }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn handle(&self) -> GuardHandle {
        GuardHandle(Arc::clone(&self.state))
    }

    /// Fails with `Timeout` or `Cancelled` once the guard has tripped.
    pub fn check(&self) -> Result<(), ChshError> {
        let ticks = self.ticks.get().wrapping_add(1);
        self.ticks.set(ticks);
        if ticks % CLOCK_INTERVAL == 0 {
            if let Some(deadline) = self.state.deadline {
                if Instant::now() >= deadline {
                    let _ = self.state.abort.compare_exchange(
                        RUNNING,
                        TIMED_OUT,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                }
            }
        }
        abort_error(&self.state)
    }
}

impl GuardHandle {
    /// Stops the script with a `Timeout` error, unless it already stopped.
    pub fn time_out(&self) {
        let _ = self.0.abort.compare_exchange(RUNNING, TIMED_OUT, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Stops the script with a `Cancelled` error, unless it already stopped.
    pub fn cancel(&self) {
        let _ = self.0.abort.compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn is_tripped(&self) -> bool {
        self.0.abort.load(Ordering::Acquire) != RUNNING
    }
}

fn abort_error(state: &GuardState) -> Result<(), ChshError> {
    match state.abort.load(Ordering::Acquire) {
        RUNNING => Ok(()),
        TIMED_OUT => Err(ChshError::Timeout { millis: state.timeout_millis }),
        _ => Err(ChshError::Cancelled),
    }
}
