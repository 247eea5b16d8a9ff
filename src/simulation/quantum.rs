// src/simulation/quantum.rs

//! The quantum game: the players share a Bell pair and may rotate and
//! measure their own half of it.

use super::sandbox::Sandbox;
use super::{BatchFuture, round_environment, tally};
use crate::core::{ChshError, StateVector};
use crate::operations::Axis;
use crate::stream::CancelToken;
use crate::vm::{Environment, ExecutionGuard, Host, Program, Value, read_move, run};
use log::{debug, trace};
use rand::Rng;
use std::time::Duration;

/// Exposes `turn` and `measure` for one qubit of a shared state.
pub(crate) struct PlayerQubit<'s> {
    state: &'s mut StateVector,
    qubit: usize,
}

impl<'s> PlayerQubit<'s> {
    pub(crate) fn new(state: &'s mut StateVector, qubit: usize) -> Self {
        Self { state, qubit }
    }

    /// `turn(axis, degrees = 180)`, where `axis` is a 3-element array.
    fn turn(&mut self, args: &[Value]) -> Result<Value, ChshError> {
        let axis = match args.first() {
            Some(Value::Array(items)) if items.len() == 3 => {
                Axis::new(items[0].to_number(), items[1].to_number(), items[2].to_number())?
            }
            other => {
                return Err(ChshError::evaluation(format!(
                    "turn() expects an axis like X, Y, Z or [x, y, z], got {}",
                    other.map_or_else(|| "nothing".to_string(), |v| v.to_string())
                )));
            }
        };
        let degrees = match args.get(1) {
            None | Some(Value::Undefined) => 180.0,
            Some(v) => v.to_number(),
        };
        self.state.rotate(self.qubit, axis, degrees.to_radians(), &[])?;
        Ok(Value::Undefined)
    }
}

impl Host for PlayerQubit<'_> {
    fn call(&mut self, name: &str, args: &[Value]) -> Option<Result<Value, ChshError>> {
        match name {
            "turn" => Some(self.turn(args)),
            "measure" => Some(self.state.measure(self.qubit).map(Value::Bool)),
            _ => None,
        }
    }
}

fn axis_value(axis: Axis) -> Value {
    Value::array(axis.components().into_iter().map(Value::Number))
}

fn quantum_environment(ref_choice: bool) -> Environment {
    let mut env = round_environment(ref_choice);
    env.define("X", axis_value(Axis::X));
    env.define("Y", axis_value(Axis::Y));
    env.define("Z", axis_value(Axis::Z));
    env.define("H", axis_value(Axis::H));
    env
}

/// Moves and referee choices of a whole batch.
#[derive(Debug, Default)]
struct QuantumRounds {
    refs: Vec<(bool, bool)>,
    moves_a: Vec<bool>,
    moves_b: Vec<bool>,
}

/// Starts a batch of `rounds` quantum games.
///
/// Every round prepares a fresh Bell pair and flips two independent referee
/// coins. Player A acts on qubit 0 and player B on qubit 1, each in its own
/// environment, so neither can see the other's variables or choice.
pub fn run_quantum_batch(
    code_a: &str,
    code_b: &str,
    rounds: usize,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<BatchFuture, ChshError> {
    let sandbox = Sandbox::new(timeout, cancel.clone());
    let code_a = code_a.to_owned();
    let code_b = code_b.to_owned();
    debug!("quantum batch: {} rounds", rounds);

    Ok(Box::pin(async move {
        let played = sandbox
            .evaluate(move |guard| play(&code_a, &code_b, rounds, guard))
            .await?;
        tally(&played.refs, &played.moves_a, &played.moves_b)
    }))
}

fn play(code_a: &str, code_b: &str, rounds: usize, guard: &ExecutionGuard) -> Result<QuantumRounds, ChshError> {
    let program_a = Program::parse(code_a)?;
    let program_b = Program::parse(code_b)?;
    let mut rng = rand::rng();
    let mut out = QuantumRounds {
        refs: Vec::with_capacity(rounds),
        moves_a: Vec::with_capacity(rounds),
        moves_b: Vec::with_capacity(rounds),
    };

    for i in 0..rounds {
        guard.check()?;
        let (ref_a, ref_b) = (rng.random_bool(0.5), rng.random_bool(0.5));
        let mut state = StateVector::bell_pair()?;

        let mut env_a = quantum_environment(ref_a);
        run(&program_a, &mut env_a, &mut PlayerQubit::new(&mut state, 0), guard)?;
        let move_a = read_move(&env_a)?;

        let mut env_b = quantum_environment(ref_b);
        run(&program_b, &mut env_b, &mut PlayerQubit::new(&mut state, 1), guard)?;
        let move_b = read_move(&env_b)?;

        trace!("round {}: refs=({}, {}) moves=({}, {})", i, ref_a, ref_b, move_a, move_b);
        out.refs.push((ref_a, ref_b));
        out.moves_a.push(move_a);
        out.moves_b.push(move_b);
    }
    Ok(out)
}
