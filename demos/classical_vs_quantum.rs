//! Plays the best classical strategy and the optimal entangled strategy side
//! by side, streaming the running tally like an editor session would.
//!
//! Run with `RUST_LOG=debug` to watch batches start and finish.

use chsh_game::{
    ChshError, GameVariant, OutcomeCounts, Renderer, Session, SessionConfig, WinSummary, classical_baseline,
};

// Prints each update on one line and the final table once
struct Console {
    name: &'static str,
}

impl Renderer for Console {
    fn draw(&self, counts: &OutcomeCounts, summary: &WinSummary) {
        println!("[{}] {}", self.name, summary.label().replace('\n', " | "));
        if counts.count_plays() >= 20_000 {
            println!("{}", counts);
        }
    }

    fn show_error(&self, error: &ChshError) {
        println!("[{}] error: {}", self.name, error);
    }
}

#[tokio::main]
async fn main() -> Result<(), ChshError> {
    env_logger::init();
    println!("--- chsh-game Example: Classical vs Quantum ---");

    let config = SessionConfig::from_json(r#"{ "rounds_per_batch": 1000, "max_batches": 20 }"#)?;

    // Classical: agree unless both referee bits are set, which a shared bit cannot detect.
    let mut classical = Session::new(
        config.clone(),
        config.classical_variant(),
        "move = false",
        "move = false",
        classical_baseline(20_000),
        Console { name: "classical" },
    )?;
    classical.recompute("move = sharedBits[0]", "move = sharedBits[0]");
    println!("classical run: {:?}", classical.wait().await);

    // Quantum: rotate halves of a Bell pair so answers agree ~85% of the time when
    // they should agree, and disagree ~85% of the time when both refs are set.
    let mut quantum = Session::new(
        config,
        GameVariant::Quantum,
        "",
        "",
        OutcomeCounts::new(),
        Console { name: "quantum" },
    )?;
    quantum.recompute(
        "if (refChoice) turn(Y, 90)\nmove = measure()",
        "turn(Y, refChoice ? -45 : 45)\nmove = measure()",
    );
    println!("quantum run: {:?}", quantum.wait().await);

    let c = WinSummary::from_counts(&classical.total());
    let q = WinSummary::from_counts(&quantum.total());
    println!("\nclassical: {:.1}%   quantum: {:.1}%", 100.0 * c.mean, 100.0 * q.mean);
    println!("quantum beats the classical bound: {}", q.verdict);
    Ok(())
}
