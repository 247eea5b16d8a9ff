// src/simulation/mod.rs

//! Plays batches of CHSH rounds.
//!
//! A batch evaluates both players' strategy scripts for every round, then
//! classifies each round into an [`OutcomeCounts`] tally. The classical and
//! quantum variants differ only in what the strategies can see and do.

mod classical;
mod quantum;
mod sandbox;

pub use classical::run_classical_batch;
pub use quantum::run_quantum_batch;
pub use sandbox::Sandbox;

use crate::core::ChshError;
use crate::core::constants::chsh_constants::DEFAULT_SHARED_BITS;
use crate::game::{OutcomeCounts, case_to_key};
use crate::stream::CancelToken;
use crate::validation::check_shared_bit_count;
use crate::vm::{Environment, Value};
use log::debug;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// The pending result of one batch.
pub type BatchFuture = Pin<Box<dyn Future<Output = Result<OutcomeCounts, ChshError>> + Send>>;

/// Which version of the game to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameVariant {
    /// Players share `shared_bit_count` random bits per round.
    Classical { shared_bit_count: u32 },
    /// Players share a Bell pair per round.
    Quantum,
}

impl Default for GameVariant {
    fn default() -> Self {
        GameVariant::Classical { shared_bit_count: DEFAULT_SHARED_BITS }
    }
}

/// Starts batches of a fixed game variant with a fixed evaluation budget.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRunner {
    variant: GameVariant,
    timeout: Option<Duration>,
}

impl TrialRunner {
    /// Creates a runner, rejecting an out-of-range shared-bit count.
    pub fn new(variant: GameVariant, timeout: Option<Duration>) -> Result<Self, ChshError> {
        if let GameVariant::Classical { shared_bit_count } = variant {
            check_shared_bit_count(shared_bit_count)?;
        }
        Ok(Self { variant, timeout })
    }

    pub fn variant(&self) -> GameVariant {
        self.variant
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Starts one batch of `rounds` rounds.
    pub fn batch(
        &self,
        code_a: &str,
        code_b: &str,
        rounds: usize,
        cancel: &CancelToken,
    ) -> Result<BatchFuture, ChshError> {
        match self.variant {
            GameVariant::Classical { shared_bit_count } => {
                run_classical_batch(code_a, code_b, rounds, shared_bit_count, self.timeout, cancel)
            }
            GameVariant::Quantum => run_quantum_batch(code_a, code_b, rounds, self.timeout, cancel),
        }
    }
}

/// Bindings every strategy starts a round with.
pub(crate) fn round_environment(ref_choice: bool) -> Environment {
    let mut env = Environment::new();
    for name in ["refChoice", "refchoice", "ref_choice"] {
        env.define(name, Value::Bool(ref_choice));
    }
    env.define("True", Value::Bool(true));
    env.define("False", Value::Bool(false));
    env.define("move", Value::Undefined);
    env
}

/// Classifies every round, after checking both players produced one move
/// per round.
pub(crate) fn tally(
    refs: &[(bool, bool)],
    moves_a: &[bool],
    moves_b: &[bool],
) -> Result<OutcomeCounts, ChshError> {
    let rounds = refs.len();
    if moves_a.len() != rounds || moves_b.len() != rounds {
        return Err(ChshError::ProtocolViolation {
            message: format!(
                "Corrupted moves: expected {} per player, got {} and {}",
                rounds,
                moves_a.len(),
                moves_b.len()
            ),
        });
    }
    let counts: OutcomeCounts = refs
        .iter()
        .zip(moves_a.iter().zip(moves_b))
        .map(|(&(ref_a, ref_b), (&move_a, &move_b))| case_to_key(ref_a, ref_b, move_a, move_b))
        .collect();
    debug!("batch tallied: {} wins / {} plays", counts.count_wins(), counts.count_plays());
    Ok(counts)
}
