// src/validation/mod.rs

//! Input and state checks shared by the simulator and the game layer.
//!
//! Every check returns `Ok(())` or the [`ChshError`] variant that callers
//! surface directly, so they compose with `?`.

use crate::core::ChshError;
use crate::core::StateVector;
use crate::core::constants::chsh_constants::{
    AXIS_NORM_TOLERANCE, MAX_ROTATION_RADIANS, MAX_SHARED_BITS, NORM_TOLERANCE,
};

/// Checks if the state vector is normalized (sum of squared amplitudes ≈ 1.0).
///
/// # Arguments
/// * `state` - The `StateVector` to check.
/// * `tolerance` - Allowed deviation from 1.0. Defaults to `NORM_TOLERANCE`.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(ChshError::Incoherence)` if normalization fails.
pub fn check_normalization(state: &StateVector, tolerance: Option<f64>) -> Result<(), ChshError> {
    let effective_tolerance = tolerance.unwrap_or(NORM_TOLERANCE);
    let norm_sq = state.norm_sqr();
    if (norm_sq - 1.0).abs() > effective_tolerance {
        Err(ChshError::Incoherence {
            message: format!(
                "State vector normalization failed. Sum(|c_i|^2) = {} (Deviation > {})",
                norm_sq, effective_tolerance
            ),
        })
    } else {
        Ok(())
    }
}

/// Checks that `(x, y, z)` is a unit vector.
///
/// # Arguments
/// * `tolerance` - Allowed deviation of `x²+y²+z²` from 1. Defaults to
///   `AXIS_NORM_TOLERANCE`.
pub fn check_axis(x: f64, y: f64, z: f64, tolerance: Option<f64>) -> Result<(), ChshError> {
    let effective_tolerance = tolerance.unwrap_or(AXIS_NORM_TOLERANCE);
    let norm_sq = x * x + y * y + z * z;
    // NaN components fail this comparison too.
    if (norm_sq - 1.0).abs() <= effective_tolerance {
        Ok(())
    } else {
        Err(ChshError::invalid_input(format!(
            "Not a unit axis: [{}, {}, {}] has squared length {}",
            x, y, z, norm_sq
        )))
    }
}

/// Rejects non-finite angles and angles larger than `MAX_ROTATION_RADIANS`.
pub fn check_angle(angle: f64) -> Result<(), ChshError> {
    if !angle.is_finite() {
        return Err(ChshError::invalid_input(format!("Rotation angle must be finite, got {}", angle)));
    }
    if angle.abs() > MAX_ROTATION_RADIANS {
        return Err(ChshError::invalid_input(format!(
            "Rotation angle {} exceeds the supported magnitude of {} radians",
            angle, MAX_ROTATION_RADIANS
        )));
    }
    Ok(())
}

/// Checks `qubit` indexes into a register of `qubit_count` qubits.
pub fn check_qubit(qubit: usize, qubit_count: usize) -> Result<(), ChshError> {
    if qubit < qubit_count {
        Ok(())
    } else {
        Err(ChshError::invalid_input(format!(
            "Qubit index {} out of range for a {}-qubit register",
            qubit, qubit_count
        )))
    }
}

/// Shared random integers are exposed as doubles, so at most 52 bits fit.
pub fn check_shared_bit_count(bits: u32) -> Result<(), ChshError> {
    if (1..=MAX_SHARED_BITS).contains(&bits) {
        Ok(())
    } else {
        Err(ChshError::invalid_input(format!(
            "Shared bit count must be between 1 and {}, got {}",
            MAX_SHARED_BITS, bits
        )))
    }
}
