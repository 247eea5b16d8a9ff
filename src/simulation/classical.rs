// src/simulation/classical.rs

//! The classical game: both players see the same random `sharedBits`.

use super::sandbox::Sandbox;
use super::{BatchFuture, round_environment, tally};
use crate::core::ChshError;
use crate::stream::CancelToken;
use crate::validation::check_shared_bit_count;
use crate::vm::{ExecutionGuard, Program, Value, read_move, run};
use log::{debug, trace};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Player A's referee choice is bit 0 of the round index, player B's bit 1.
const REF_MASK_A: usize = 1;
const REF_MASK_B: usize = 2;

/// Referee choices for round `i`. Cycling instead of flipping coins covers
/// all four cases evenly, so deterministic strategies score exactly.
pub(crate) fn cycled_referee_choices(i: usize) -> (bool, bool) {
    (i & REF_MASK_A != 0, i & REF_MASK_B != 0)
}

/// Starts a batch of `rounds` classical games.
///
/// # Arguments
/// * `code_a`, `code_b` - Strategy scripts for the two players.
/// * `rounds` - Number of rounds to play.
/// * `shared_bit_count` - Length of `sharedBits`, `1..=52`.
/// * `timeout` - Budget for each player's evaluation. `None` is unlimited.
/// * `cancel` - Stops the batch when cancelled.
///
/// # Returns
/// * `Err(ChshError::InvalidInput)` immediately for a bad `shared_bit_count`.
/// * Otherwise a future resolving to the batch's counts, or the first failure
///   of either player.
pub fn run_classical_batch(
    code_a: &str,
    code_b: &str,
    rounds: usize,
    shared_bit_count: u32,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<BatchFuture, ChshError> {
    check_shared_bit_count(shared_bit_count)?;

    let mut rng = rand::rng();
    let shared: Arc<[u64]> = (0..rounds)
        .map(|_| rng.random_range(0..1u64 << shared_bit_count))
        .collect();

    let sandbox = Sandbox::new(timeout, cancel.clone());
    let code_a = code_a.to_owned();
    let code_b = code_b.to_owned();
    debug!("classical batch: {} rounds, {} shared bits", rounds, shared_bit_count);

    Ok(Box::pin(async move {
        let job_a = {
            let shared = Arc::clone(&shared);
            move |guard: &ExecutionGuard| {
                play(&code_a, &shared, shared_bit_count, |i| cycled_referee_choices(i).0, guard)
            }
        };
        let job_b = {
            let shared = Arc::clone(&shared);
            move |guard: &ExecutionGuard| {
                play(&code_b, &shared, shared_bit_count, |i| cycled_referee_choices(i).1, guard)
            }
        };
        let (moves_a, moves_b) = tokio::try_join!(sandbox.evaluate(job_a), sandbox.evaluate(job_b))?;

        let refs: Vec<(bool, bool)> = (0..rounds).map(cycled_referee_choices).collect();
        tally(&refs, &moves_a, &moves_b)
    }))
}

/// Runs one player's strategy for every round, each in a fresh environment.
fn play(
    code: &str,
    shared: &[u64],
    shared_bit_count: u32,
    ref_choice: impl Fn(usize) -> bool,
    guard: &ExecutionGuard,
) -> Result<Vec<bool>, ChshError> {
    let program = Program::parse(code)?;
    let mut moves = Vec::with_capacity(shared.len());
    for (i, &bits) in shared.iter().enumerate() {
        guard.check()?;
        let shared_bits = Value::array((0..shared_bit_count).map(|b| Value::Bool(bits >> b & 1 == 1)));
        let mut env = round_environment(ref_choice(i));
        env.define("sharedBits", shared_bits.clone());
        env.define("sharedbits", shared_bits.clone());
        env.define("shared_bits", shared_bits);

        run(&program, &mut env, &mut (), guard)?;
        let m = read_move(&env)?;
        trace!("round {}: ref={} move={}", i, ref_choice(i), m);
        moves.push(m);
    }
    Ok(moves)
}
