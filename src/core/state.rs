// src/core/state.rs

use crate::core::ChshError;
use crate::core::constants::chsh_constants::{MAX_QUBITS, NORM_TOLERANCE, PI};
use crate::operations::{Axis, Operation, Rotation};
use crate::validation::{check_normalization, check_qubit};
use log::trace;
use num_complex::Complex;
use num_traits::Zero;
use rand::Rng;
use std::fmt;

/// The joint state of a small qubit register, stored as `2^n` complex
/// amplitudes.
///
/// Basis index `k` encodes qubit `q` in bit `q` of `k`, so qubit 0 is the
/// least significant bit. A fresh vector is `|0...0⟩`. Rotations keep the
/// squared norm at 1; measurement collapses and renormalises.
#[derive(Debug, Clone, PartialEq)] // Avoid Eq for floating-point complex numbers
pub struct StateVector {
    qubit_count: usize,
    amplitudes: Vec<Complex<f64>>,
}

impl StateVector {
    /// Creates the all-zero state `|0...0⟩` for `qubit_count` qubits.
    ///
    /// # Arguments
    /// * `qubit_count` - Register width, `1..=MAX_QUBITS`.
    ///
    /// # Returns
    /// * `Err(ChshError::InvalidInput)` for an empty or oversized register.
    pub fn new(qubit_count: usize) -> Result<Self, ChshError> {
        if qubit_count == 0 || qubit_count > MAX_QUBITS {
            return Err(ChshError::invalid_input(format!(
                "qubit count must be between 1 and {}, got {}",
                MAX_QUBITS, qubit_count
            )));
        }
        let mut amplitudes = vec![Complex::zero(); 1usize << qubit_count];
        amplitudes[0] = Complex::new(1.0, 0.0);
        Ok(Self { qubit_count, amplitudes })
    }

    /// Builds the entangled pair `(|00⟩ + |11⟩)/√2`: a Hadamard on qubit 0
    /// followed by a bit flip of qubit 1 controlled by qubit 0.
    pub fn bell_pair() -> Result<Self, ChshError> {
        let mut state = Self::new(2)?;
        state.rotate(0, Axis::H, PI, &[])?;
        state.rotate(1, Axis::X, PI, &[0])?;
        Ok(state)
    }

    /// Wraps caller-provided amplitudes after checking the length is a power
    /// of two and the vector is normalised.
    pub fn from_amplitudes(amplitudes: Vec<Complex<f64>>) -> Result<Self, ChshError> {
        let len = amplitudes.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(ChshError::invalid_input(format!(
                "amplitude count must be a power of two >= 2, got {}",
                len
            )));
        }
        let qubit_count = len.trailing_zeros() as usize;
        if qubit_count > MAX_QUBITS {
            return Err(ChshError::invalid_input(format!(
                "{} qubits exceeds the maximum of {}",
                qubit_count, MAX_QUBITS
            )));
        }
        let state = Self { qubit_count, amplitudes };
        check_normalization(&state, None)?;
        Ok(state)
    }

    pub fn qubit_count(&self) -> usize {
        self.qubit_count
    }

    /// Read-only view of the amplitudes.
    pub fn amplitudes(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    /// Copy of the amplitudes as interleaved `(re, im)` pairs.
    pub fn peek(&self) -> Vec<f64> {
        self.amplitudes.iter().flat_map(|c| [c.re, c.im]).collect()
    }

    /// Sum of squared magnitudes. 1 for any valid state.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Probability that measuring `target` yields 1.
    pub fn probability_of_one(&self, target: usize) -> Result<f64, ChshError> {
        check_qubit(target, self.qubit_count)?;
        let mask = 1usize << target;
        Ok(self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, c)| c.norm_sqr())
            .sum())
    }

    /// Rotates `target` around `axis` by `angle` radians, restricted to the
    /// subspace where every qubit in `controls` is 1.
    ///
    /// # Arguments
    /// * `target` - Qubit to rotate.
    /// * `axis` - Unit rotation axis.
    /// * `angle` - Radians; `π` applies the axis' Pauli operator.
    /// * `controls` - Qubits that must be set for the rotation to act.
    pub fn rotate(
        &mut self,
        target: usize,
        axis: Axis,
        angle: f64,
        controls: &[usize],
    ) -> Result<(), ChshError> {
        let rotation = Rotation::new(axis, angle)?;
        self.apply_rotation(target, &rotation, controls)
    }

    /// Applies an already validated rotation. See [`StateVector::rotate`].
    pub fn apply_rotation(
        &mut self,
        target: usize,
        rotation: &Rotation,
        controls: &[usize],
    ) -> Result<(), ChshError> {
        check_qubit(target, self.qubit_count)?;
        let mut control_mask = 0usize;
        for &control in controls {
            check_qubit(control, self.qubit_count)?;
            if control == target {
                return Err(ChshError::invalid_input(format!(
                    "qubit {} cannot control its own rotation",
                    target
                )));
            }
            control_mask |= 1 << control;
        }

        let target_mask = 1usize << target;
        let [[a, b], [c, d]] = rotation.matrix();
        trace!("rotate q{} {} controls={:?}", target, rotation, controls);

        for i in 0..self.amplitudes.len() {
            if i & target_mask != 0 || i & control_mask != control_mask {
                continue;
            }
            let j = i | target_mask;
            let u = self.amplitudes[i];
            let v = self.amplitudes[j];
            self.amplitudes[i] = a * u + b * v;
            self.amplitudes[j] = c * u + d * v;
        }
        Ok(())
    }

    /// Measures `target` using the thread-local RNG.
    pub fn measure(&mut self, target: usize) -> Result<bool, ChshError> {
        self.measure_with(target, &mut rand::rng())
    }

    /// Measures `target`, drawing the outcome from `rng`.
    ///
    /// Amplitudes inconsistent with the outcome are zeroed and the rest are
    /// rescaled so the norm is 1 again. Certain outcomes (`p == 0` or
    /// `p == 1`) are returned without consulting chance.
    pub fn measure_with<R: Rng>(
        &mut self,
        target: usize,
        rng: &mut R,
    ) -> Result<bool, ChshError> {
        let p = self.probability_of_one(target)?.clamp(0.0, 1.0);
        let draw: f64 = rng.random();
        let outcome = draw < p;

        let kept = if outcome { p } else { 1.0 - p };
        let scale = 1.0 / kept.sqrt();
        let mask = 1usize << target;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                *amp *= scale;
            } else {
                *amp = Complex::zero();
            }
        }
        trace!("measure q{} p1={:.4} -> {}", target, p, outcome);
        Ok(outcome)
    }

    /// Applies one [`Operation`]. Measurements return their outcome.
    pub fn apply(&mut self, op: &Operation) -> Result<Option<bool>, ChshError> {
        match op {
            Operation::Rotate { target, rotation, controls } => {
                self.apply_rotation(*target, rotation, controls)?;
                Ok(None)
            }
            Operation::Measure { target } => self.measure(*target).map(Some),
        }
    }

    /// Checks the vector is still normalised.
    pub fn validate(&self) -> Result<(), ChshError> {
        check_normalization(self, Some(NORM_TOLERANCE))
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StateVector ({} qubits):", self.qubit_count)?;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            if amp.norm_sqr() < 1e-12 {
                continue;
            }
            // Qubit 0 printed rightmost.
            writeln!(
                f,
                "  |{:0width$b}⟩: {:+.4}{:+.4}i  (p={:.4})",
                i,
                amp.re,
                amp.im,
                amp.norm_sqr(),
                width = self.qubit_count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TEST_TOLERANCE: f64 = 1e-9;

    fn assert_peek_approx(state: &StateVector, expected: &[f64]) {
        let actual = state.peek();
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < TEST_TOLERANCE, "component {}: {} != {}\n{}", i, a, e, state);
        }
    }

    #[test]
    fn new_state_is_all_zero_basis() -> Result<(), ChshError> {
        let s = StateVector::new(2)?;
        assert_peek_approx(&s, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(StateVector::new(0).is_err());
        assert!(StateVector::new(MAX_QUBITS + 1).is_err());
        Ok(())
    }

    #[test]
    fn bell_pair_amplitudes() -> Result<(), ChshError> {
        let s = StateVector::bell_pair()?;
        let f = FRAC_1_SQRT_2;
        assert_peek_approx(&s, &[f, 0.0, 0.0, 0.0, 0.0, 0.0, f, 0.0]);
        Ok(())
    }

    #[test]
    fn controlled_rotation_skips_unset_controls() -> Result<(), ChshError> {
        let mut s = StateVector::new(2)?;
        s.rotate(1, Axis::X, PI, &[0])?;
        assert_peek_approx(&s, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn rotate_rejects_bad_qubits() -> Result<(), ChshError> {
        let mut s = StateVector::new(2)?;
        assert!(s.rotate(2, Axis::X, PI, &[]).is_err());
        assert!(s.rotate(0, Axis::X, PI, &[0]).is_err());
        assert!(s.rotate(0, Axis::X, PI, &[5]).is_err());
        Ok(())
    }

    #[test]
    fn measurement_collapses_and_is_repeatable() -> Result<(), ChshError> {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut s = StateVector::bell_pair()?;
            let first = s.measure_with(0, &mut rng)?;
            assert_eq!(s.measure_with(0, &mut rng)?, first);
            // Perfectly correlated partner.
            assert_eq!(s.measure_with(1, &mut rng)?, first);
            s.validate()?;
        }
        Ok(())
    }

    #[test]
    fn from_amplitudes_validates() {
        let ok = StateVector::from_amplitudes(vec![
            Complex::new(0.6, 0.0),
            Complex::new(0.0, 0.8),
        ]);
        assert!(ok.is_ok());
        let not_normalised =
            StateVector::from_amplitudes(vec![Complex::new(1.0, 0.0), Complex::new(1.0, 0.0)]);
        assert!(matches!(not_normalised, Err(ChshError::Incoherence { .. })));
        let bad_len = StateVector::from_amplitudes(vec![Complex::new(1.0, 0.0); 3]);
        assert!(matches!(bad_len, Err(ChshError::InvalidInput { .. })));
    }

    #[test]
    fn apply_dispatches_operations() -> Result<(), ChshError> {
        let mut s = StateVector::new(1)?;
        let flip = Operation::Rotate {
            target: 0,
            rotation: Rotation::new(Axis::X, PI)?,
            controls: vec![],
        };
        assert_eq!(s.apply(&flip)?, None);
        assert_eq!(s.apply(&Operation::Measure { target: 0 })?, Some(true));
        Ok(())
    }
}
