// src/stream/progress.rs

//! Drops results that were overtaken by newer work.
//!
//! Every piece of work gets a [`Ticket`] when it starts. When it finishes,
//! the tracker decides whether the outcome is still worth showing:
//! a success is dropped if something issued later has already been shown,
//! and a failure is shown only if nothing newer has been started since.

use crate::core::constants::chsh_constants::SEQUENCE_HALF_SPACE;
use log::trace;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// 16-bit cyclic identifier. Fewer than 32768 tickets may be outstanding.
pub type SequenceId = u16;

/// Proof that a piece of work was started through a [`ProgressTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(SequenceId);

impl Ticket {
    pub fn id(self) -> SequenceId {
        self.0
    }
}

type Report<T, E> = Box<dyn FnMut(Result<T, E>) + Send>;

struct TrackerState<T, E> {
    next_id: SequenceId,
    latest_completed: SequenceId,
    report: Report<T, E>,
}

/// Filters out stale completions before forwarding them to a reporter.
///
/// Clones share the same sequence and reporter.
pub struct ProgressTracker<T, E> {
    state: Arc<Mutex<TrackerState<T, E>>>,
}

impl<T, E> Clone for ProgressTracker<T, E> {
    fn clone(&self) -> Self {
        Self { state: Arc::clone(&self.state) }
    }
}

impl<T, E> std::fmt::Debug for ProgressTracker<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ProgressTracker")
            .field("next_id", &state.next_id)
            .field("latest_completed", &state.latest_completed)
            .finish_non_exhaustive()
    }
}

impl<T, E> ProgressTracker<T, E> {
    pub fn new(report: impl FnMut(Result<T, E>) + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(TrackerState {
                next_id: 1,
                latest_completed: 0,
                report: Box::new(report),
            })),
        }
    }

    /// Starts tracking a new piece of work.
    pub fn issue(&self) -> Ticket {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id = id.wrapping_add(1);
        Ticket(id)
    }

    /// Finishes the work behind `ticket`. Returns whether `result` was
    /// forwarded to the reporter.
    pub fn complete(&self, ticket: Ticket, result: Result<T, E>) -> bool {
        let mut state = self.state.lock();
        let id = ticket.0;
        let forward = match &result {
            // At or before the latest completion, cyclically.
            Ok(_) => state.latest_completed.wrapping_sub(id) >= SEQUENCE_HALF_SPACE,
            Err(_) => id.wrapping_add(1) == state.next_id,
        };
        if forward {
            state.latest_completed = id;
            (state.report)(result);
        } else {
            trace!("dropping stale completion for ticket {}", id);
        }
        forward
    }

    /// Issues a ticket, runs `work` on the runtime and completes the ticket
    /// with its output. The handle resolves to whether it was forwarded.
    pub fn track<F>(&self, work: F) -> JoinHandle<bool>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let ticket = self.issue();
        let tracker = self.clone();
        tokio::spawn(async move {
            let result = work.await;
            tracker.complete(ticket, result)
        })
    }
}
