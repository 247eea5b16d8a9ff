// tests/session_tests.rs

use chsh_game::{
    ChshError, GameVariant, OutcomeCounts, Renderer, Scoring, Session, SessionConfig, StreamOutcome, Verdict,
    WinSummary, classical_baseline,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Shown {
    Counts(OutcomeCounts),
    Error(ChshError),
}

// Renderer keeping a log of everything it was asked to show
#[derive(Clone, Default)]
struct Screen {
    log: Arc<Mutex<Vec<Shown>>>,
    summaries: Arc<Mutex<Vec<WinSummary>>>,
}

impl Screen {
    fn log(&self) -> Vec<Shown> {
        self.log.lock().clone()
    }

    fn errors(&self) -> Vec<ChshError> {
        self.log()
            .into_iter()
            .filter_map(|s| match s {
                Shown::Error(e) => Some(e),
                Shown::Counts(_) => None,
            })
            .collect()
    }
}

impl Renderer for Screen {
    fn draw(&self, counts: &OutcomeCounts, summary: &WinSummary) {
        assert_eq!(summary.plays, counts.count_plays());
        self.log.lock().push(Shown::Counts(*counts));
        self.summaries.lock().push(*summary);
    }

    fn show_error(&self, error: &ChshError) {
        self.log.lock().push(Shown::Error(error.clone()));
    }
}

fn small_config() -> SessionConfig {
    SessionConfig {
        rounds_per_batch: 4,
        max_batches: Some(3),
        concurrency: 1,
        timeout_millis: Some(2000),
        shared_bit_count: 16,
        error_grace_millis: 20,
        scoring: Scoring::Chsh,
    }
}

fn session(config: SessionConfig, screen: &Screen) -> Result<Session, ChshError> {
    let variant = config.classical_variant();
    Session::new(config, variant, "move = false", "move = false", classical_baseline(1000), screen.clone())
}

#[tokio::test]
async fn test_baseline_is_drawn_and_unchanged_code_is_ignored() -> Result<(), ChshError> {
    let screen = Screen::default();
    let mut s = session(small_config(), &screen)?;
    assert_eq!(screen.log(), vec![Shown::Counts(classical_baseline(1000))]);
    assert_eq!(s.total(), classical_baseline(1000));

    assert!(!s.recompute("move = false", "move = false"));
    assert_eq!(s.wait().await, None);
    assert_eq!(screen.log().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_recompute_streams_a_growing_total() -> Result<(), ChshError> {
    let screen = Screen::default();
    let mut s = session(small_config(), &screen)?;

    assert!(s.recompute("move = true", "move = true"));
    assert_eq!(s.wait().await, Some(StreamOutcome::Exhausted { completed: 3 }));

    let plays: Vec<u64> = screen
        .log()
        .iter()
        .skip(1)
        .map(|shown| match shown {
            Shown::Counts(c) => c.count_plays(),
            Shown::Error(e) => panic!("unexpected error {}", e),
        })
        .collect();
    assert_eq!(plays, vec![4, 8, 12]);
    assert_eq!(s.total().count_plays(), 12);
    assert_eq!(s.total().count_wins(), 9);
    Ok(())
}

#[tokio::test]
async fn test_errors_are_shown_after_the_grace_period() -> Result<(), ChshError> {
    let screen = Screen::default();
    let config = SessionConfig { error_grace_millis: 100, ..small_config() };
    let mut s = session(config, &screen)?;

    assert!(s.recompute("move = 2", "move = true"));
    assert_eq!(s.wait().await, Some(StreamOutcome::Failed));
    assert!(screen.errors().is_empty(), "error shown before the grace period");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        screen.errors(),
        vec![ChshError::Evaluation { message: "'move' variable ended up 2 instead of true or false".into() }]
    );
    Ok(())
}

#[tokio::test]
async fn test_fixing_the_code_within_the_grace_period_hides_the_error() -> Result<(), ChshError> {
    let screen = Screen::default();
    let config = SessionConfig { error_grace_millis: 300, ..small_config() };
    let mut s = session(config, &screen)?;

    s.recompute("move = ", "move = true");
    assert_eq!(s.wait().await, Some(StreamOutcome::Failed));
    s.recompute("move = true", "move = true");
    assert_eq!(s.wait().await, Some(StreamOutcome::Exhausted { completed: 3 }));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(screen.errors().is_empty());
    assert_eq!(screen.log().last(), Some(&Shown::Counts(s.total())));
    Ok(())
}

#[tokio::test]
async fn test_new_code_cancels_the_previous_run() -> Result<(), ChshError> {
    let screen = Screen::default();
    let config = SessionConfig { max_batches: None, timeout_millis: None, ..small_config() };
    let mut s = session(config, &screen)?;

    s.recompute("while (true) {}", "move = true");
    tokio::time::sleep(Duration::from_millis(20)).await;
    s.recompute("move = false", "while (true) {}");
    assert_eq!(s.total(), OutcomeCounts::new());
    s.cancel();
    assert_eq!(s.wait().await, Some(StreamOutcome::Cancelled));

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Cancellation is never displayed.
    assert!(screen.errors().is_empty());
    assert_eq!(screen.log().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_quantum_session() -> Result<(), ChshError> {
    let screen = Screen::default();
    let config = SessionConfig { rounds_per_batch: 500, max_batches: Some(4), concurrency: 2, ..small_config() };
    let mut s = Session::new(config, GameVariant::Quantum, "", "", OutcomeCounts::new(), screen.clone())?;
    assert_eq!(s.variant(), GameVariant::Quantum);

    s.recompute(
        "if (refChoice) turn(Y, 90); move = measure();",
        "turn(Y, refChoice ? -45 : 45); move = measure();",
    );
    assert_eq!(s.wait().await, Some(StreamOutcome::Exhausted { completed: 4 }));
    let summary = WinSummary::from_counts(&s.total());
    assert_eq!(summary.plays, 2000);
    assert!(summary.mean > 0.78, "win rate {}", summary.mean);
    Ok(())
}

#[tokio::test]
async fn test_signalling_session_scores_against_a_coin_flip() -> Result<(), ChshError> {
    let screen = Screen::default();
    let config = SessionConfig { scoring: Scoring::Signalling, ..small_config() };
    let mut s = session(config, &screen)?;

    // B cannot see refA, so a constant answer is right for half the rounds.
    s.recompute("move = true", "move = false");
    assert_eq!(s.wait().await, Some(StreamOutcome::Exhausted { completed: 3 }));

    let summaries = screen.summaries.lock().clone();
    let last = summaries.last().expect("summary drawn");
    assert_eq!(last.scoring, Scoring::Signalling);
    assert_eq!((last.wins, last.plays), (6, 12));
    assert_eq!(last.verdict, Verdict::No);
    assert_eq!(last.label().lines().nth(1), Some("6 correct out of 12"));
    assert!(summaries.iter().all(|summary| summary.scoring == Scoring::Signalling));
    Ok(())
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let screen = Screen::default();
    let bad = SessionConfig { rounds_per_batch: 0, ..small_config() };
    assert!(matches!(session(bad, &screen), Err(ChshError::InvalidInput { .. })));
    let result = Session::new(
        small_config(),
        GameVariant::Classical { shared_bit_count: 60 },
        "",
        "",
        OutcomeCounts::new(),
        screen.clone(),
    );
    assert!(matches!(result, Err(ChshError::InvalidInput { .. })));
    assert!(screen.log().is_empty());
}
