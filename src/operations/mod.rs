// src/operations/mod.rs

//! Defines the single-qubit rotations and measurements that can be applied
//! to a [`StateVector`](crate::core::StateVector).
//!
//! A rotation is parameterised by a unit axis `(x, y, z)` on the Bloch sphere
//! and an angle. Rotating by `π` applies the Pauli operator `x·X + y·Y + z·Z`
//! itself (so the X axis flips a qubit, the H axis is a Hadamard), smaller
//! angles apply fractional powers of it.

use crate::core::ChshError;
use crate::validation::{check_angle, check_axis};
use num_complex::Complex;
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;

/// A validated unit vector on the Bloch sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    x: f64,
    y: f64,
    z: f64,
}

impl Axis {
    /// Bit flip axis.
    pub const X: Axis = Axis { x: 1.0, y: 0.0, z: 0.0 };
    pub const Y: Axis = Axis { x: 0.0, y: 1.0, z: 0.0 };
    /// Phase flip axis.
    pub const Z: Axis = Axis { x: 0.0, y: 0.0, z: 1.0 };
    /// Halfway between X and Z; a half turn around it is a Hadamard.
    pub const H: Axis = Axis { x: FRAC_1_SQRT_2, y: 0.0, z: FRAC_1_SQRT_2 };

    /// Creates an axis, rejecting vectors whose squared norm is not ~1.
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self, ChshError> {
        check_axis(x, y, z, None)?;
        Ok(Self { x, y, z })
    }

    /// Returns `[x, y, z]`.
    pub fn components(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl TryFrom<[f64; 3]> for Axis {
    type Error = ChshError;

    fn try_from(v: [f64; 3]) -> Result<Self, Self::Error> {
        Axis::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}, {:.4}]", self.x, self.y, self.z)
    }
}

/// A rotation of one qubit around `axis` by `angle` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    axis: Axis,
    angle: f64,
}

impl Rotation {
    /// Creates a rotation. The angle must be finite and of sane magnitude.
    pub fn new(axis: Axis, angle: f64) -> Result<Self, ChshError> {
        check_angle(angle)?;
        Ok(Self { axis, angle })
    }

    /// Creates a rotation from an angle in degrees (180° is a half turn).
    pub fn from_degrees(axis: Axis, degrees: f64) -> Result<Self, ChshError> {
        Self::new(axis, degrees.to_radians())
    }

    /// The rotation that undoes this one.
    pub fn inverse(&self) -> Self {
        Self { axis: self.axis, angle: -self.angle }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Computes the 2x2 unitary `[[a, b], [c, d]]` for this rotation.
    ///
    /// With `U = x·X + y·Y + z·Z` and `p = e^(i·angle)`, the operator is
    /// `((1+p)·I + (1-p)·U) / 2`, expanded here into real and imaginary parts.
    pub fn matrix(&self) -> [[Complex<f64>; 2]; 2] {
        let [x, y, z] = self.axis.components();
        let pr = self.angle.cos();
        let pi = self.angle.sin();

        let a = Complex::new((1.0 + pr + z - pr * z) / 2.0, (pi - pi * z) / 2.0);
        let b = Complex::new((x - pr * x - pi * y) / 2.0, (-y + pr * y - pi * x) / 2.0);
        let c = Complex::new((x - pr * x + pi * y) / 2.0, (y - pr * y - pi * x) / 2.0);
        let d = Complex::new((1.0 + pr - z + pr * z) / 2.0, (pi + pi * z) / 2.0);

        [[a, b], [c, d]]
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Turn({} by {:.2}°)", self.axis, self.angle.to_degrees())
    }
}

/// An operation applied to a state vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Rotate `target`, but only within the subspace where every control
    /// qubit is 1.
    Rotate {
        /// The qubit being rotated.
        target: usize,
        rotation: Rotation,
        /// Qubits that must all be 1 for the rotation to act. May be empty.
        controls: Vec<usize>,
    },

    /// Measure `target` in the computational basis, collapsing the state.
    Measure {
        /// The qubit being measured.
        target: usize,
    },
}

impl Operation {
    /// Returns every qubit index the operation reads or writes.
    pub fn involved_qubits(&self) -> Vec<usize> {
        match self {
            Operation::Rotate { target, controls, .. } => {
                let mut qubits = Vec::with_capacity(controls.len() + 1);
                qubits.push(*target);
                qubits.extend_from_slice(controls);
                qubits
            }
            Operation::Measure { target } => vec![*target],
        }
    }
}
