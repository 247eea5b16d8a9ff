// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod state;

pub use error::ChshError;
pub use state::StateVector;

pub mod constants;
pub use constants::chsh_constants::{CLASSICAL_WIN_BOUND, PI, QUANTUM_WIN_RATE}; // Re-export
