//! Numeric constants shared by the simulator and the game layer.

/// Constants for the state vector, the CHSH game and the streaming layer.
pub mod chsh_constants {
    /// Used for rotation angles (`e^(iθ)`)
    pub const PI: f64 = std::f64::consts::PI;

    /// Largest register the state vector will allocate (2^16 amplitudes).
    pub const MAX_QUBITS: usize = 16;
    /// Allowed deviation of a rotation axis' squared norm from 1.
    pub const AXIS_NORM_TOLERANCE: f64 = 1e-4;
    /// Rotation angles beyond this magnitude (radians) are rejected.
    pub const MAX_ROTATION_RADIANS: f64 = 1.0e6;
    /// Default tolerance for `sum |amp|^2 == 1`.
    pub const NORM_TOLERANCE: f64 = 1e-9;

    /// Number of distinct (refA, refB, moveA, moveB) cases.
    pub const OUTCOME_CASE_COUNT: usize = 16;
    /// Shared random integers must fit in an f64 mantissa: 1..=52 bits.
    pub const MAX_SHARED_BITS: u32 = 52;
    pub const DEFAULT_SHARED_BITS: u32 = 16;

    /// Best achievable win rate for local hidden-variable strategies.
    pub const CLASSICAL_WIN_BOUND: f64 = 0.75;
    /// Best rate for guessing the other player's referee bit.
    pub const SIGNALLING_BASELINE: f64 = 0.5;
    /// cos²(π/8), the Tsirelson-optimal quantum win rate.
    pub const QUANTUM_WIN_RATE: f64 = 0.853_553_390_593_273_7;

    /// Half the 16-bit sequence space used by the progress tracker; ids
    /// closer than this are comparable.
    pub const SEQUENCE_HALF_SPACE: u16 = 0x8000;
}
