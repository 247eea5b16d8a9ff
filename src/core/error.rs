//! Error handling logic

use thiserror::Error;

/// Errors raised by the simulator, the strategy VM and the streaming layer.
///
/// Input problems are reported synchronously, before any asynchronous work
/// starts. Everything that goes wrong while a batch is being evaluated
/// (timeouts, script failures, malformed results) rejects that whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChshError {
    /// A caller-supplied parameter is out of range: shared-bit count,
    /// rotation axis or angle, qubit index, configuration value.
    #[error("Invalid Input: {message}")]
    InvalidInput {
        /// Description of the rejected input
        message: String,
    },

    /// A strategy evaluation ran past its time budget and was terminated.
    #[error("Timeout: evaluation did not finish within {millis}ms")]
    Timeout {
        /// The budget that was exceeded, in milliseconds
        millis: u64,
    },

    /// Strategy code failed to parse, threw, or produced an unusable `move`.
    #[error("Evaluation Error: {message}")]
    Evaluation {
        /// Evaluation failure message
        message: String,
    },

    /// An evaluation returned a result of the wrong shape (e.g. too few moves).
    #[error("Protocol Violation: {message}")]
    ProtocolViolation {
        /// ProtocolViolation failure message
        message: String,
    },

    /// Work was stopped on request. Expected, not alarming.
    #[error("Cancelled")]
    Cancelled,

    /// The state vector lost its unit norm.
    #[error("Incoherence Violation: {message}")]
    Incoherence {
        /// Incoherence failure message
        message: String,
    },

    /// General error encountered during the simulation process itself.
    #[error("Simulation Process Error: {message}")]
    SimulationError {
        /// SimulationError failure message
        message: String,
    },
}

impl ChshError {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        ChshError::InvalidInput { message: message.into() }
    }

    pub(crate) fn evaluation(message: impl Into<String>) -> Self {
        ChshError::Evaluation { message: message.into() }
    }

    /// True for the cancellation variant, which callers treat as a quiet stop.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChshError::Cancelled)
    }
}
