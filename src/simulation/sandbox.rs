// src/simulation/sandbox.rs

//! Runs one evaluation job on a blocking worker with a deadline and a
//! cancellation token.

use crate::core::ChshError;
use crate::stream::CancelToken;
use crate::vm::{ExecutionGuard, GuardHandle};
use log::{debug, warn};
use std::time::Duration;

/// Isolated, time-limited execution of strategy evaluations.
///
/// Each job gets its own [`ExecutionGuard`] and runs on tokio's blocking
/// pool. The job races the timeout and the cancel token; when it loses, the
/// guard is tripped so the interpreter stops at its next check. Dropping the
/// `evaluate` future before the worker joins trips the guard too.
#[derive(Debug, Clone)]
pub struct Sandbox {
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Sandbox {
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self { timeout, cancel }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Runs `job` to completion, or fails with `Timeout` / `Cancelled`.
    ///
    /// # Returns
    /// * The job's own result when it finishes in time.
    /// * `Err(ChshError::SimulationError)` if the worker panicked.
    pub async fn evaluate<T, F>(&self, job: F) -> Result<T, ChshError>
    where
        F: FnOnce(&ExecutionGuard) -> Result<T, ChshError> + Send + 'static,
        T: Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(ChshError::Cancelled);
        }

        let guard = ExecutionGuard::new(self.timeout);
        let handle = guard.handle();
        let mut stop_on_drop = StopOnDrop(Some(guard.handle()));
        let mut worker = tokio::task::spawn_blocking(move || job(&guard));

        let timeout = self.timeout;
        let expiry = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            joined = &mut worker => match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("evaluation worker failed: {}", e);
                    Err(ChshError::SimulationError { message: format!("evaluation worker failed: {}", e) })
                }
            },
            _ = expiry => {
                handle.time_out();
                let millis = timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
                debug!("evaluation timed out after {}ms", millis);
                Err(ChshError::Timeout { millis })
            }
            _ = self.cancel.cancelled() => {
                handle.cancel();
                debug!("evaluation cancelled");
                Err(ChshError::Cancelled)
            }
        };
        stop_on_drop.disarm();
        outcome
    }
}

/// Cancels the worker's guard unless disarmed first.
struct StopOnDrop(Option<GuardHandle>);

impl StopOnDrop {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            debug!("evaluation dropped before the worker finished, stopping it");
            handle.cancel();
        }
    }
}
