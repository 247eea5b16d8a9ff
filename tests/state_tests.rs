// tests/state_tests.rs

use chsh_game::{Axis, ChshError, Operation, Rotation, StateVector};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

const F: f64 = FRAC_1_SQRT_2;

// Helper comparing interleaved (re, im) amplitudes within float noise
fn assert_peek(state: &StateVector, expected: &[f64]) {
    let actual = state.peek();
    assert_eq!(actual.len(), expected.len(), "length mismatch for {}", state);
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-6, "component {}: got {:?}, expected {:?}", i, actual, expected);
    }
}

#[test]
fn test_half_turns_on_one_qubit() -> Result<(), ChshError> {
    let mut s = StateVector::new(1)?;

    // X
    s.rotate(0, Axis::X, PI, &[])?;
    assert_peek(&s, &[0.0, 0.0, 1.0, 0.0]);
    s.rotate(0, Axis::X, PI, &[])?;
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);

    // H on |0>
    s.rotate(0, Axis::H, PI, &[])?;
    assert_peek(&s, &[F, 0.0, F, 0.0]);
    s.rotate(0, Axis::H, PI, &[])?;
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);

    // Z on |0>
    s.rotate(0, Axis::Z, PI, &[])?;
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);

    // Y
    s.rotate(0, Axis::Y, PI, &[])?;
    assert_peek(&s, &[0.0, 0.0, 0.0, 1.0]);
    s.rotate(0, Axis::Y, PI, &[])?;
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);

    s.rotate(0, Axis::X, PI, &[])?;

    // H on |1>
    s.rotate(0, Axis::H, PI, &[])?;
    assert_peek(&s, &[F, 0.0, -F, 0.0]);
    s.rotate(0, Axis::H, PI, &[])?;
    assert_peek(&s, &[0.0, 0.0, 1.0, 0.0]);

    // Z on |1>
    s.rotate(0, Axis::Z, PI, &[])?;
    assert_peek(&s, &[0.0, 0.0, -1.0, 0.0]);
    s.rotate(0, Axis::Z, PI, &[])?;
    assert_peek(&s, &[0.0, 0.0, 1.0, 0.0]);
    Ok(())
}

#[test]
fn test_quarter_turns_on_one_qubit() -> Result<(), ChshError> {
    let mut s = StateVector::new(1)?;

    // sqrt(X)
    let expected_x = [
        [0.5, 0.5, 0.5, -0.5],
        [0.0, 0.0, 1.0, 0.0],
        [0.5, -0.5, 0.5, 0.5],
        [1.0, 0.0, 0.0, 0.0],
    ];
    for expected in &expected_x {
        s.rotate(0, Axis::X, PI / 2.0, &[])?;
        assert_peek(&s, expected);
    }

    // sqrt(Y)
    let expected_y = [
        [0.5, 0.5, 0.5, 0.5],
        [0.0, 0.0, 0.0, 1.0],
        [0.5, -0.5, -0.5, 0.5],
        [1.0, 0.0, 0.0, 0.0],
    ];
    for expected in &expected_y {
        s.rotate(0, Axis::Y, PI / 2.0, &[])?;
        assert_peek(&s, expected);
    }

    // sqrt(Z) only changes the phase of |1>
    s.rotate(0, Axis::Z, PI / 2.0, &[])?;
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);
    s.rotate(0, Axis::X, PI, &[])?;
    let expected_z = [
        [0.0, 0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0, 0.0],
        [0.0, 0.0, 0.0, -1.0],
        [0.0, 0.0, 1.0, 0.0],
    ];
    for expected in &expected_z {
        s.rotate(0, Axis::Z, PI / 2.0, &[])?;
        assert_peek(&s, expected);
    }
    Ok(())
}

#[test]
fn test_two_qubit_turns_with_controls() -> Result<(), ChshError> {
    let mut s = StateVector::new(2)?;

    s.rotate(0, Axis::H, PI, &[])?;
    assert_peek(&s, &[F, 0.0, F, 0.0, 0.0, 0.0, 0.0, 0.0]);

    s.rotate(1, Axis::H, PI, &[])?;
    assert_peek(&s, &[0.5, 0.0, 0.5, 0.0, 0.5, 0.0, 0.5, 0.0]);

    s.rotate(0, Axis::H, PI, &[])?;
    assert_peek(&s, &[F, 0.0, 0.0, 0.0, F, 0.0, 0.0, 0.0]);

    s.rotate(0, Axis::X, PI, &[1])?;
    assert_peek(&s, &[F, 0.0, 0.0, 0.0, 0.0, 0.0, F, 0.0]);

    s.rotate(1, Axis::X, PI, &[0])?;
    assert_peek(&s, &[F, 0.0, F, 0.0, 0.0, 0.0, 0.0, 0.0]);
    Ok(())
}

#[test]
fn test_measurement_of_one_qubit() -> Result<(), ChshError> {
    let mut s = StateVector::new(1)?;

    assert!(!s.measure(0)?);
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);
    assert!(!s.measure(0)?);
    s.rotate(0, Axis::X, PI, &[])?;
    assert!(s.measure(0)?);
    assert_peek(&s, &[0.0, 0.0, 1.0, 0.0]);
    assert!(s.measure(0)?);
    s.rotate(0, Axis::X, PI, &[])?;
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);

    for _ in 0..10 {
        s.rotate(0, Axis::H, PI, &[])?;
        if s.measure(0)? {
            assert_peek(&s, &[0.0, 0.0, 1.0, 0.0]);
            s.rotate(0, Axis::X, PI, &[])?;
        } else {
            assert_peek(&s, &[1.0, 0.0, 0.0, 0.0]);
        }
    }
    Ok(())
}

#[test]
fn test_measurement_of_two_qubits() -> Result<(), ChshError> {
    let mut s = StateVector::new(2)?;
    s.rotate(0, Axis::H, PI, &[])?;
    s.rotate(1, Axis::H, PI, &[])?;

    for _ in 0..10 {
        if s.measure(0)? {
            assert_peek(&s, &[0.0, 0.0, F, 0.0, 0.0, 0.0, F, 0.0]);
            s.rotate(0, Axis::X, PI, &[])?;
        } else {
            assert_peek(&s, &[F, 0.0, 0.0, 0.0, F, 0.0, 0.0, 0.0]);
        }
        s.rotate(0, Axis::H, PI, &[])?;

        if s.measure(1)? {
            assert_peek(&s, &[0.0, 0.0, 0.0, 0.0, F, 0.0, F, 0.0]);
            s.rotate(1, Axis::X, PI, &[])?;
        } else {
            assert_peek(&s, &[F, 0.0, F, 0.0, 0.0, 0.0, 0.0, 0.0]);
        }
        s.rotate(1, Axis::H, PI, &[])?;
    }
    Ok(())
}

#[test]
fn test_bell_pair_correlations() -> Result<(), ChshError> {
    let pair = StateVector::bell_pair()?;
    assert_peek(&pair, &[F, 0.0, 0.0, 0.0, 0.0, 0.0, F, 0.0]);

    // Rotating both halves by the same Y angle keeps outcomes equal.
    for _ in 0..20 {
        let mut s = StateVector::bell_pair()?;
        s.rotate(0, Axis::Y, PI / 3.0, &[])?;
        s.rotate(1, Axis::Y, PI / 3.0, &[])?;
        let a = s.measure(0)?;
        assert_eq!(s.measure(1)?, a);
    }
    Ok(())
}

#[test]
fn test_operations_apply_in_sequence() -> Result<(), ChshError> {
    let mut s = StateVector::new(2)?;
    let ops = [
        Operation::Rotate { target: 0, rotation: Rotation::new(Axis::X, PI)?, controls: vec![] },
        Operation::Rotate { target: 1, rotation: Rotation::from_degrees(Axis::X, 180.0)?, controls: vec![0] },
        Operation::Measure { target: 1 },
    ];
    let outcomes: Vec<Option<bool>> = ops.iter().map(|op| s.apply(op)).collect::<Result<_, _>>()?;
    assert_eq!(outcomes, vec![None, None, Some(true)]);
    s.validate()?;
    Ok(())
}

#[test]
fn test_invalid_rotations_are_rejected() -> Result<(), ChshError> {
    let mut s = StateVector::new(2)?;
    let cases: [(usize, [f64; 3], f64, Vec<usize>); 5] = [
        (2, [1.0, 0.0, 0.0], PI, vec![]),
        (0, [1.0, 1.0, 0.0], PI, vec![]),
        (0, [1.0, 0.0, 0.0], f64::NAN, vec![]),
        (0, [1.0, 0.0, 0.0], PI, vec![0]),
        (0, [1.0, 0.0, 0.0], PI, vec![5]),
    ];
    for (target, [x, y, z], angle, controls) in cases {
        let result = Axis::new(x, y, z).and_then(|axis| s.rotate(target, axis, angle, &controls));
        assert!(
            matches!(result, Err(ChshError::InvalidInput { .. })),
            "accepted target={} axis=({}, {}, {}) angle={} controls={:?}",
            target, x, y, z, angle, controls
        );
    }
    // Nothing was applied.
    assert_peek(&s, &[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    Ok(())
}
