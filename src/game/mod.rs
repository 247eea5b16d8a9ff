// src/game/mod.rs

//! Scoring for the CHSH game: per-round classification, aggregated counts and
//! win-rate statistics.

pub mod counts;
pub mod outcome;
pub mod stats;

pub use counts::OutcomeCounts;
pub use outcome::{GameCase, OutcomeKey, case_to_is_win, case_to_key};
pub use stats::{Scoring, Verdict, WinSummary};
