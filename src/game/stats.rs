// src/game/stats.rs

//! Summary statistics for judging whether a strategy beats the classical bound.

use crate::core::constants::chsh_constants::{CLASSICAL_WIN_BOUND, SIGNALLING_BASELINE};
use crate::game::counts::OutcomeCounts;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rounds of a tally count as wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    /// `moveA XOR moveB == refA AND refB`. Local strategies top out at 75%.
    #[default]
    Chsh,
    /// Player B names player A's referee bit (`moveB == refA`). Without
    /// communication nothing beats a coin flip, entangled or not.
    Signalling,
}

impl Scoring {
    pub fn wins(self, counts: &OutcomeCounts) -> u64 {
        match self {
            Scoring::Chsh => counts.count_wins(),
            Scoring::Signalling => {
                let mut correct = 0;
                for ref_a in [false, true] {
                    for ref_b in [false, true] {
                        for move_a in [false, true] {
                            correct += counts.count_for_case(ref_a, ref_b, move_a, ref_a);
                        }
                    }
                }
                correct
            }
        }
    }

    /// Win rate reachable without the effect being tested for.
    pub fn baseline(self) -> f64 {
        match self {
            Scoring::Chsh => CLASSICAL_WIN_BOUND,
            Scoring::Signalling => SIGNALLING_BASELINE,
        }
    }
}

/// How convincingly the observed win rate exceeds the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Within one standard deviation.
    No,
    /// Within three.
    ProbablyNot,
    /// Within five. Roughly 1 in 750 by chance.
    Maybe,
    LooksLikeIt,
}

impl Verdict {
    fn from_sigma(over: f64) -> Self {
        if over <= 1.0 {
            Verdict::No
        } else if over <= 3.0 {
            Verdict::ProbablyNot
        } else if over <= 5.0 {
            Verdict::Maybe
        } else {
            Verdict::LooksLikeIt
        }
    }

    /// Wording used for the CHSH game.
    pub fn text(&self) -> &'static str {
        self.text_for(Scoring::Chsh)
    }

    pub fn text_for(&self, scoring: Scoring) -> &'static str {
        match (scoring, self) {
            (Scoring::Chsh, Verdict::No) => "No",
            (Scoring::Chsh, Verdict::ProbablyNot) => "Probably Not",
            (Scoring::Chsh, Verdict::Maybe) => "Maybe. Could be lucky? σ>3",
            (Scoring::Signalling, Verdict::No) => "Nope. Just noise.",
            (Scoring::Signalling, Verdict::ProbablyNot) => "Probably Not.",
            (Scoring::Signalling, Verdict::Maybe) => "Maybe. Or lucky? σ>3",
            (_, Verdict::LooksLikeIt) => "Looks like it! σ>5",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Win rate of a tally together with a rough error estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinSummary {
    pub plays: u64,
    pub wins: u64,
    /// `wins / plays`, or 0 with no plays.
    pub mean: f64,
    /// Standard deviation of the Laplace-smoothed rate `(w+1)/(p+2)`.
    pub std_dev: f64,
    /// Three standard deviations.
    pub error_bars: f64,
    /// Distance of the better of `mean` and `1 - mean` above the scoring's
    /// baseline, in units of `std_dev`. Negative when below.
    pub sigma_over_baseline: f64,
    pub verdict: Verdict,
    pub scoring: Scoring,
}

impl WinSummary {
    /// Summary under CHSH scoring.
    pub fn from_counts(counts: &OutcomeCounts) -> Self {
        Self::scored(counts, Scoring::Chsh)
    }

    pub fn scored(counts: &OutcomeCounts, scoring: Scoring) -> Self {
        let plays = counts.count_plays();
        let wins = scoring.wins(counts);
        let (p, w) = (plays as f64, wins as f64);

        let mean = if plays == 0 { 0.0 } else { w / p };
        let smoothed = (w + 1.0) / (p + 2.0);
        let std_dev = (smoothed * (1.0 - smoothed) / (p + 1.0)).sqrt();
        let over = (mean.max(1.0 - mean) - scoring.baseline()) / std_dev;
        // No data means no evidence either way.
        let sigma_over_baseline = if plays == 0 { 0.0 } else { over };

        WinSummary {
            plays,
            wins,
            mean,
            std_dev,
            error_bars: 3.0 * std_dev,
            sigma_over_baseline,
            verdict: Verdict::from_sigma(sigma_over_baseline),
            scoring,
        }
    }

    /// Three display lines: rate with error bars, raw counts, verdict.
    pub fn label(&self) -> String {
        let tally = match self.scoring {
            Scoring::Chsh => format!("{} wins out of {} plays", self.wins, self.plays),
            Scoring::Signalling => format!("{} correct out of {}", self.wins, self.plays),
        };
        format!(
            "~{:.1}% (±{:.1}%)\n{}\n{}",
            100.0 * self.mean,
            100.0 * self.error_bars,
            tally,
            self.verdict.text_for(self.scoring)
        )
    }
}

impl fmt::Display for WinSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
