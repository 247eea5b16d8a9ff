//! Prepares a Bell pair, rotates each half by a different angle and estimates
//! how often the two measurements agree. The agreement rate follows
//! cos²(Δθ/2), which is what the entangled CHSH strategy exploits.

use chsh_game::{Axis, ChshError, Operation, Rotation, StateVector};

const SHOTS: usize = 5000;

fn agreement(angle_a: f64, angle_b: f64) -> Result<f64, ChshError> {
    let ops = [
        Operation::Rotate { target: 0, rotation: Rotation::from_degrees(Axis::Y, angle_a)?, controls: vec![] },
        Operation::Rotate { target: 1, rotation: Rotation::from_degrees(Axis::Y, angle_b)?, controls: vec![] },
    ];
    let mut agree = 0;
    for _ in 0..SHOTS {
        let mut pair = StateVector::bell_pair()?;
        for op in &ops {
            pair.apply(op)?;
        }
        if pair.measure(0)? == pair.measure(1)? {
            agree += 1;
        }
    }
    Ok(agree as f64 / SHOTS as f64)
}

fn main() -> Result<(), ChshError> {
    println!("--- chsh-game Example: Bell Pair Rotations ---");
    let pair = StateVector::bell_pair()?;
    println!("Initial state:\n{}", pair);

    println!("{:>8} {:>8} {:>10} {:>10}", "A (deg)", "B (deg)", "measured", "cos²(Δ/2)");
    let settings: [(f64, f64); 6] = [(0.0, 0.0), (0.0, 45.0), (90.0, 45.0), (0.0, -45.0), (90.0, -45.0), (0.0, 180.0)];
    for (a, b) in settings {
        let measured = agreement(a, b)?;
        let expected = ((a - b) / 2.0).to_radians().cos().powi(2);
        println!("{:>8} {:>8} {:>10.3} {:>10.3}", a, b, measured, expected);
    }
    Ok(())
}
