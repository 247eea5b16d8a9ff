// src/game/counts.rs

use crate::core::constants::chsh_constants::OUTCOME_CASE_COUNT;
use crate::game::outcome::{OutcomeKey, case_to_key};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many times each of the 16 outcome cases occurred.
///
/// Values are immutable: [`OutcomeCounts::merged_with`] returns a new total
/// rather than updating in place, so a running total can be shared freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutcomeCounts {
    counts: [u64; OUTCOME_CASE_COUNT],
}

impl OutcomeCounts {
    /// No plays recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds counts from `(key, count)` pairs. Duplicate keys are summed,
    /// non-positive counts are ignored.
    pub fn from_counts<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OutcomeKey, i64)>,
    {
        let mut result = Self::default();
        for (key, count) in pairs {
            if count > 0 {
                result.counts[key.index()] += count.unsigned_abs();
            }
        }
        result
    }

    pub fn count_for_key(&self, key: OutcomeKey) -> u64 {
        self.counts[key.index()]
    }

    pub fn count_for_case(&self, ref_a: bool, ref_b: bool, move_a: bool, move_b: bool) -> u64 {
        self.count_for_key(case_to_key(ref_a, ref_b, move_a, move_b))
    }

    pub fn count_wins(&self) -> u64 {
        OutcomeKey::all().filter(|k| k.is_win()).map(|k| self.count_for_key(k)).sum()
    }

    pub fn count_plays(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count_plays() == 0
    }

    /// Sum of both tallies, key by key.
    pub fn merged_with(&self, other: &OutcomeCounts) -> OutcomeCounts {
        let mut result = *self;
        for (mine, theirs) in result.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
        result
    }

    /// Non-zero entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (OutcomeKey, u64)> + '_ {
        OutcomeKey::all()
            .map(|k| (k, self.count_for_key(k)))
            .filter(|(_, n)| *n > 0)
    }
}

impl FromIterator<OutcomeKey> for OutcomeCounts {
    fn from_iter<I: IntoIterator<Item = OutcomeKey>>(iter: I) -> Self {
        let mut result = Self::default();
        for key in iter {
            result.counts[key.index()] += 1;
        }
        result
    }
}

/// Renders the 4x4 table: rows are Alice's (refChoice, move), columns Bob's.
/// Losing cells carry a leading `-`.
impl fmt::Display for OutcomeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} | {:>8} {:>8} {:>8} {:>8}", "ALICE\\BOB", "r0 m0", "r0 m1", "r1 m0", "r1 m1")?;
        for row in 0..4 {
            let (ref_a, move_a) = (row & 2 != 0, row & 1 != 0);
            write!(f, "{:>12} |", format!("r{} m{}", u8::from(ref_a), u8::from(move_a)))?;
            for col in 0..4 {
                let (ref_b, move_b) = (col & 2 != 0, col & 1 != 0);
                let key = case_to_key(ref_a, ref_b, move_a, move_b);
                let n = self.count_for_key(key);
                let cell = match (n, key.is_win()) {
                    (0, _) => String::new(),
                    (n, true) => n.to_string(),
                    (n, false) => format!("-{}", n),
                };
                write!(f, " {:>8}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
