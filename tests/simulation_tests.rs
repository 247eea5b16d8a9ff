// tests/simulation_tests.rs

use chsh_game::{
    CancelToken, ChshError, GameVariant, OutcomeCounts, OutcomeKey, TrialRunner, WinSummary,
    run_classical_batch, run_quantum_batch,
};
use std::time::Duration;

const OPTIMAL_A: &str = "if (refChoice) turn(Y, 90); move = measure();";
const OPTIMAL_B: &str = "turn(Y, refChoice ? -45 : 45); move = measure();";

// Helper counting raw outcome keys
fn out(keys: &[u8]) -> OutcomeCounts {
    keys.iter()
        .map(|&k| OutcomeKey::new(k).expect("key in range"))
        .collect()
}

async fn classical(code_a: &str, code_b: &str, rounds: usize) -> Result<OutcomeCounts, ChshError> {
    run_classical_batch(code_a, code_b, rounds, 16, Some(Duration::from_secs(5)), &CancelToken::new())?.await
}

#[tokio::test]
async fn test_classical_constant_strategies() -> Result<(), ChshError> {
    assert_eq!(classical("move=false", "move=false", 4).await?, out(&[0, 1, 2, 3]));
    assert_eq!(classical("move=false", "move=true", 4).await?, out(&[8, 9, 10, 11]));
    Ok(())
}

#[tokio::test]
async fn test_classical_referee_dependent_strategy() -> Result<(), ChshError> {
    assert_eq!(classical("move=refChoice", "move=true", 4).await?, out(&[8, 13, 10, 15]));
    assert_eq!(
        classical("move=refChoice", "move=true", 8).await?,
        out(&[8, 8, 13, 13, 10, 10, 15, 15])
    );
    Ok(())
}

#[tokio::test]
async fn test_classical_shared_bits_reach_but_never_beat_the_bound() -> Result<(), ChshError> {
    let counts = classical("move = sharedBits[3]", "move = shared_bits[3]", 400).await?;
    assert_eq!(counts.count_plays(), 400);
    assert_eq!(counts.count_wins(), 300);
    Ok(())
}

#[tokio::test]
async fn test_classical_timeout_rejects_the_batch() {
    let result = run_classical_batch(
        "while(true);",
        "move=true",
        1,
        16,
        Some(Duration::from_millis(10)),
        &CancelToken::new(),
    )
    .unwrap()
    .await;
    assert_eq!(result, Err(ChshError::Timeout { millis: 10 }));
}

#[tokio::test]
async fn test_classical_script_errors_reject_the_batch() {
    for code in ["{", "throw 1;", "move = 2", "move = undefinedThing"] {
        let result = classical(code, "move=true", 1).await;
        assert!(matches!(result, Err(ChshError::Evaluation { .. })), "{:?}: {:?}", code, result);
    }
}

#[tokio::test]
async fn test_long_expression_chains_are_syntax_errors() {
    let sum = format!("move = {}1 == 0", "1+".repeat(200_000));
    let index = format!("move = sharedBits{}", "[0]".repeat(200_000));
    for code in [sum, index] {
        let result = classical(&code, "move=true", 1).await;
        assert!(
            matches!(&result, Err(ChshError::Evaluation { message }) if message.starts_with("SyntaxError: nesting too deep")),
            "{:?}",
            result
        );
    }
}

#[test]
fn test_failed_player_stops_the_other_players_worker() {
    // Two blocking threads: if the spinning worker outlived its batch, the
    // second batch could only start one of its two players.
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(2)
        .enable_all()
        .build()
        .expect("runtime");

    let (failed, next) = rt.block_on(async {
        let failed = run_classical_batch("move = (", "while(true);", 1, 16, None, &CancelToken::new())
            .expect("batch")
            .await;
        let next = tokio::time::timeout(Duration::from_secs(5), classical("move=false", "move=false", 4)).await;
        (failed, next)
    });
    rt.shutdown_timeout(Duration::from_secs(1));

    assert!(matches!(failed, Err(ChshError::Evaluation { .. })), "{:?}", failed);
    assert_eq!(next.expect("second batch stalled behind a leaked worker"), Ok(out(&[0, 1, 2, 3])));
}

#[tokio::test]
async fn test_classical_cancellation() {
    let cancel = CancelToken::new();
    let batch = run_classical_batch("while(true);", "move=true", 1, 16, None, &cancel).unwrap();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        })
    };
    assert_eq!(batch.await, Err(ChshError::Cancelled));
    canceller.await.unwrap();
}

#[tokio::test]
async fn test_quantum_without_rotations_matches_classical_bound() -> Result<(), ChshError> {
    let counts = run_quantum_batch(
        "move = measure()",
        "move = measure()",
        2000,
        Some(Duration::from_secs(10)),
        &CancelToken::new(),
    )?
    .await?;
    // Equal moves every round: only the both-refs-set rounds are lost.
    for (key, _) in counts.iter() {
        let case = key.case();
        assert_eq!(case.move_a, case.move_b);
    }
    let rate = WinSummary::from_counts(&counts).mean;
    assert!((0.70..=0.80).contains(&rate), "rate {}", rate);
    Ok(())
}

#[tokio::test]
async fn test_quantum_optimal_strategy_beats_the_bound() -> Result<(), ChshError> {
    let runner = TrialRunner::new(GameVariant::Quantum, Some(Duration::from_secs(10)))?;
    let counts = runner.batch(OPTIMAL_A, OPTIMAL_B, 4000, &CancelToken::new())?.await?;
    let summary = WinSummary::from_counts(&counts);
    println!("optimal quantum strategy:\n{}\n{}", counts, summary);
    assert_eq!(summary.plays, 4000);
    assert!((0.80..=0.90).contains(&summary.mean), "win rate {}", summary.mean);
    Ok(())
}

#[tokio::test]
async fn test_quantum_players_only_reach_their_own_qubit() -> Result<(), ChshError> {
    // Player B flips qubit 1 only, so moves always differ.
    let counts = run_quantum_batch("move = measure()", "turn(X); move = measure()", 200, None, &CancelToken::new())?
        .await?;
    for (key, _) in counts.iter() {
        let case = key.case();
        assert_ne!(case.move_a, case.move_b);
    }
    Ok(())
}

#[tokio::test]
async fn test_runner_dispatches_on_variant() -> Result<(), ChshError> {
    let cancel = CancelToken::new();
    let classical = TrialRunner::new(GameVariant::Classical { shared_bit_count: 4 }, None)?;
    // Quantum-only functions are not available classically.
    let err = classical.batch("turn(X); move = true", "move = true", 1, &cancel)?.await.unwrap_err();
    assert_eq!(err, ChshError::Evaluation { message: "TypeError: turn is not a function".into() });

    let counts = classical.batch("move = sharedBits.length == 4", "move = true", 4, &cancel)?.await?;
    assert_eq!(counts.count_for_case(false, false, true, true), 1);
    assert_eq!(counts.count_plays(), 4);
    Ok(())
}
