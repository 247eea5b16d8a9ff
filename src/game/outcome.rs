// src/game/outcome.rs

//! Classification of a single CHSH round.

use crate::core::ChshError;
use crate::core::constants::chsh_constants::OUTCOME_CASE_COUNT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four bits observed in one round: both referee choices and both moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameCase {
    pub ref_a: bool,
    pub ref_b: bool,
    pub move_a: bool,
    pub move_b: bool,
}

impl GameCase {
    pub fn new(ref_a: bool, ref_b: bool, move_a: bool, move_b: bool) -> Self {
        Self { ref_a, ref_b, move_a, move_b }
    }

    pub fn key(&self) -> OutcomeKey {
        case_to_key(self.ref_a, self.ref_b, self.move_a, self.move_b)
    }

    pub fn is_win(&self) -> bool {
        case_to_is_win(self.ref_a, self.ref_b, self.move_a, self.move_b)
    }
}

/// Compact encoding of a [`GameCase`] in `0..16`.
///
/// Bit 0 is refA, bit 1 refB, bit 2 moveA, bit 3 moveB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OutcomeKey(u8);

impl OutcomeKey {
    /// Every key, in ascending order.
    pub fn all() -> impl Iterator<Item = OutcomeKey> {
        (0..OUTCOME_CASE_COUNT as u8).map(OutcomeKey)
    }

    pub fn new(key: u8) -> Result<Self, ChshError> {
        if usize::from(key) < OUTCOME_CASE_COUNT {
            Ok(OutcomeKey(key))
        } else {
            Err(ChshError::invalid_input(format!("Outcome key {} is outside 0..16", key)))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Decodes the key back into its four bits.
    pub fn case(self) -> GameCase {
        GameCase {
            ref_a: self.0 & 1 != 0,
            ref_b: self.0 & 2 != 0,
            move_a: self.0 & 4 != 0,
            move_b: self.0 & 8 != 0,
        }
    }

    pub fn is_win(self) -> bool {
        self.case().is_win()
    }
}

impl TryFrom<u8> for OutcomeKey {
    type Error = ChshError;

    fn try_from(key: u8) -> Result<Self, Self::Error> {
        OutcomeKey::new(key)
    }
}

impl From<OutcomeKey> for u8 {
    fn from(key: OutcomeKey) -> u8 {
        key.0
    }
}

impl fmt::Display for OutcomeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encodes a round as `refA + 2·refB + 4·moveA + 8·moveB`.
pub fn case_to_key(ref_a: bool, ref_b: bool, move_a: bool, move_b: bool) -> OutcomeKey {
    OutcomeKey(u8::from(ref_a) | u8::from(ref_b) << 1 | u8::from(move_a) << 2 | u8::from(move_b) << 3)
}

/// The players win when their moves differ exactly when both referee
/// choices are set.
pub fn case_to_is_win(ref_a: bool, ref_b: bool, move_a: bool, move_b: bool) -> bool {
    (move_a != move_b) == (ref_a && ref_b)
}
