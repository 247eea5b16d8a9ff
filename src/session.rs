// src/session.rs

//! An interactive game session: re-runs the game whenever either strategy
//! changes and streams the growing tally to a [`Renderer`].

use crate::config::SessionConfig;
use crate::core::ChshError;
use crate::game::{OutcomeCounts, OutcomeKey, WinSummary};
use crate::simulation::{GameVariant, TrialRunner};
use crate::stream::{CancelGroup, ProgressTracker, StreamOutcome, delayed_err, stream_batches};
use log::{debug, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Receives what a session wants displayed.
///
/// Calls are already filtered for staleness: a `draw` or `show_error` is
/// never followed by output belonging to an older recompute.
pub trait Renderer: Send + Sync + 'static {
    fn draw(&self, counts: &OutcomeCounts, summary: &WinSummary);
    fn show_error(&self, error: &ChshError);
}

/// The counts two `move = false` strategies produce over `plays` rounds of
/// the classical game with cycled referee choices: a quarter of the plays
/// in each referee case, both moves false.
pub fn classical_baseline(plays: u64) -> OutcomeCounts {
    OutcomeCounts::from_counts(
        OutcomeKey::all()
            .take(4)
            .map(|key| (key, i64::try_from(plays / 4).unwrap_or(i64::MAX))),
    )
}

/// Owns the state behind one pair of strategy editors.
pub struct Session {
    config: SessionConfig,
    runner: TrialRunner,
    tracker: ProgressTracker<OutcomeCounts, ChshError>,
    cancels: CancelGroup,
    sources: (String, String),
    total: Arc<Mutex<OutcomeCounts>>,
    current: Option<JoinHandle<StreamOutcome>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("runner", &self.runner)
            .field("sources", &self.sources)
            .field("total", &*self.total.lock())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session showing `baseline` for the initial strategies
    /// instead of computing them.
    ///
    /// # Errors
    /// `InvalidInput` if `config` or `variant` is out of range.
    pub fn new(
        config: SessionConfig,
        variant: GameVariant,
        initial_a: &str,
        initial_b: &str,
        baseline: OutcomeCounts,
        renderer: impl Renderer,
    ) -> Result<Self, ChshError> {
        config.validate()?;
        let runner = TrialRunner::new(variant, config.timeout())?;
        let renderer: Arc<dyn Renderer> = Arc::new(renderer);
        let scoring = config.scoring;
        let tracker = ProgressTracker::new(move |result: Result<OutcomeCounts, ChshError>| match result {
            Ok(counts) => renderer.draw(&counts, &WinSummary::scored(&counts, scoring)),
            Err(e) => renderer.show_error(&e),
        });

        let ticket = tracker.issue();
        tracker.complete(ticket, Ok(baseline));

        Ok(Self {
            config,
            runner,
            tracker,
            cancels: CancelGroup::new(),
            sources: (initial_a.to_owned(), initial_b.to_owned()),
            total: Arc::new(Mutex::new(baseline)),
            current: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn variant(&self) -> GameVariant {
        self.runner.variant()
    }

    /// The running total of the most recent recompute (or the baseline).
    pub fn total(&self) -> OutcomeCounts {
        *self.total.lock()
    }

    /// Restarts the game for new strategies. Must be called inside a tokio
    /// runtime.
    ///
    /// Returns `false` without doing anything if neither source changed.
    /// Otherwise the previous run is cancelled and a fresh stream of batches
    /// starts from an empty tally.
    pub fn recompute(&mut self, code_a: &str, code_b: &str) -> bool {
        if self.sources.0 == code_a && self.sources.1 == code_b {
            return false;
        }
        self.sources = (code_a.to_owned(), code_b.to_owned());
        let stopped = self.cancels.cancel_all();
        debug!("recompute: cancelled {} previous run(s)", stopped);

        let token = self.cancels.token();
        let total = Arc::new(Mutex::new(OutcomeCounts::new()));
        self.total = Arc::clone(&total);

        let factory = {
            let runner = self.runner.clone();
            let (code_a, code_b) = self.sources.clone();
            let rounds = self.config.rounds_per_batch;
            let token = token.clone();
            move || runner.batch(&code_a, &code_b, rounds, &token)
        };
        let on_value = {
            let tracker = self.tracker.clone();
            move |partial: OutcomeCounts| {
                let merged = {
                    let mut total = total.lock();
                    *total = total.merged_with(&partial);
                    *total
                };
                let ticket = tracker.issue();
                tracker.complete(ticket, Ok(merged));
            }
        };
        let on_error = {
            let tracker = self.tracker.clone();
            let grace = self.config.error_grace();
            move |e: ChshError| {
                if e.is_cancelled() {
                    return;
                }
                warn!("strategy run failed: {}", e);
                tracker.track(delayed_err(e, grace));
            }
        };
        let limits = self.config.limits();

        self.current = Some(tokio::spawn(async move {
            stream_batches(factory, on_value, on_error, limits, &token).await
        }));
        true
    }

    /// Stops the current run, if any.
    pub fn cancel(&self) {
        self.cancels.cancel_all();
    }

    /// Waits for the current run to stop. `None` if nothing was running.
    pub async fn wait(&mut self) -> Option<StreamOutcome> {
        let handle = self.current.take()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => None,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancels.cancel_all();
    }
}
