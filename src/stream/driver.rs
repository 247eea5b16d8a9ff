// src/stream/driver.rs

use super::cancel::CancelToken;
use crate::core::ChshError;
use log::{debug, warn};
use std::future::Future;
use tokio::task::JoinSet;

/// Bounds on a [`stream_batches`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamLimits {
    /// Total batches to start. `None` streams until failure or cancellation.
    pub max_batches: Option<usize>,
    /// Batches in flight at once. 0 is treated as 1.
    pub concurrency: usize,
}

impl Default for StreamLimits {
    fn default() -> Self {
        Self { max_batches: None, concurrency: 1 }
    }
}

/// How a [`stream_batches`] run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every permitted batch finished successfully.
    Exhausted { completed: usize },
    /// A batch failed; `on_error` was called with its error.
    Failed,
    /// The cancel token fired first.
    Cancelled,
}

/// Repeatedly starts batches from `factory` and feeds their results to
/// `on_value` in completion order.
///
/// At most `limits.concurrency` batches are in flight; each completion
/// immediately makes room for a replacement until `limits.max_batches` have
/// been started. The first failure (including a failure to start) stops the
/// stream and is passed to `on_error`. Batches still running when the stream
/// stops are detached and their results ignored.
pub async fn stream_batches<T, Fut, F, V, E>(
    mut factory: F,
    mut on_value: V,
    on_error: E,
    limits: StreamLimits,
    cancel: &CancelToken,
) -> StreamOutcome
where
    F: FnMut() -> Result<Fut, ChshError>,
    Fut: Future<Output = Result<T, ChshError>> + Send + 'static,
    T: Send + 'static,
    V: FnMut(T),
    E: FnOnce(ChshError),
{
    let concurrency = limits.concurrency.max(1);
    let may_start = |started: usize| limits.max_batches.is_none_or(|max| started < max);

    let mut in_flight = JoinSet::new();
    let mut started = 0usize;
    let mut completed = 0usize;

    loop {
        while in_flight.len() < concurrency && may_start(started) && !cancel.is_cancelled() {
            // Count before spawning so a synchronous failure still counts as started.
            started += 1;
            match factory() {
                Ok(batch) => {
                    in_flight.spawn(batch);
                }
                Err(e) => {
                    warn!("batch {} failed to start: {}", started, e);
                    in_flight.detach_all();
                    on_error(e);
                    return StreamOutcome::Failed;
                }
            }
        }

        if cancel.is_cancelled() {
            in_flight.detach_all();
            debug!("stream cancelled after {} batches", completed);
            return StreamOutcome::Cancelled;
        }
        if in_flight.is_empty() {
            debug!("stream exhausted after {} batches", completed);
            return StreamOutcome::Exhausted { completed };
        }

        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => continue,
            joined = in_flight.join_next() => joined,
        };

        match joined {
            Some(Ok(Ok(value))) => {
                completed += 1;
                on_value(value);
            }
            Some(Ok(Err(e))) => {
                warn!("batch failed, stopping stream: {}", e);
                in_flight.detach_all();
                on_error(e);
                return StreamOutcome::Failed;
            }
            Some(Err(join_error)) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic());
            }
            Some(Err(join_error)) => {
                in_flight.detach_all();
                on_error(ChshError::SimulationError { message: format!("batch task failed: {}", join_error) });
                return StreamOutcome::Failed;
            }
            None => {}
        }
    }
}
