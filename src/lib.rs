// src/lib.rs

//! `chsh-game` - A simulator for the CHSH Bell-inequality game
//!
//! Two players who cannot communicate each receive a referee bit and answer
//! with a move bit. They win when their moves differ exactly when both
//! referee bits are set. Players sharing only classical randomness can win at
//! most 75% of rounds; players sharing an entangled qubit pair can reach
//! about 85.4%. Strategies are short scripts, played for many rounds and
//! tallied into [`OutcomeCounts`].

pub mod config;
pub mod core;
pub mod game;
pub mod operations;
pub mod session;
pub mod simulation;
pub mod stream;
pub mod validation;
pub mod vm;

// Re-export the most common types for easier top-level use
pub use config::SessionConfig;
pub use core::{ChshError, StateVector};
pub use game::{
    GameCase, OutcomeCounts, OutcomeKey, Scoring, Verdict, WinSummary, case_to_is_win, case_to_key,
};
pub use operations::{Axis, Operation, Rotation};
pub use session::{Renderer, Session, classical_baseline};
pub use simulation::{GameVariant, TrialRunner, run_classical_batch, run_quantum_batch};
pub use stream::{CancelToken, ProgressTracker, StreamLimits, StreamOutcome, stream_batches};
pub use validation::{check_axis, check_normalization, check_shared_bit_count};

// Example 1: A deterministic classical strategy
// Both players always answer `false`. With cycled referee choices they lose
// exactly the rounds where both referee bits are set.
/// ```
/// use chsh_game::{CancelToken, ChshError, GameVariant, TrialRunner};
/// use std::time::Duration;
///
/// let rt = tokio::runtime::Runtime::new().expect("runtime");
/// let counts = rt.block_on(async {
///     let runner = TrialRunner::new(GameVariant::default(), Some(Duration::from_secs(2)))?;
///     runner.batch("move = false", "move = false", 400, &CancelToken::new())?.await
/// })?;
///
/// assert_eq!(counts.count_plays(), 400);
/// assert_eq!(counts.count_wins(), 300);
/// # Ok::<(), ChshError>(())
/// ```
#[doc(hidden)]
const _: () = ();

// Example 2: Entanglement without any game
// Measuring both halves of a Bell pair always gives matching results.
/// ```
/// use chsh_game::{ChshError, StateVector};
///
/// for _ in 0..20 {
///     let mut pair = StateVector::bell_pair()?;
///     let first = pair.measure(0)?;
///     assert_eq!(pair.measure(1)?, first);
/// }
/// # Ok::<(), ChshError>(())
/// ```
#[doc(hidden)]
const _: () = ();
