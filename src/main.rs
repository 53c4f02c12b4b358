//! Dice Predictor CLI
//!
//! Offline tools for the history engine: replay captured feed frames or run
//! it against simulated fair dice.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dice_predictor::services::{FeedClient, Metrics, RoundTracker};
use dice_predictor::{HistoryEngine, Outcome, PredictorConfig, RoundResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dice-predictor")]
#[command(about = "Offline tools for the dice round predictor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a capture of raw feed frames (one JSON frame per line)
    Replay {
        /// Capture file
        file: PathBuf,

        /// Seed for the fallback heuristic
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// History capacity
        #[arg(short, long, default_value = "1000")]
        capacity: usize,

        /// Number of most recent rounds to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Run the engine against simulated fair dice
    Simulate {
        /// Number of rounds to roll
        #[arg(short, long, default_value = "1000")]
        rounds: usize,

        /// Seed for the dice and the fallback heuristic
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Replay {
            file,
            seed,
            capacity,
            limit,
        } => replay(&file, seed, capacity, limit)?,
        Commands::Simulate { rounds, seed } => simulate(rounds, seed),
    }

    Ok(())
}

fn engine_config(seed: u64, capacity: usize) -> PredictorConfig {
    PredictorConfig {
        capacity: capacity.max(1),
        fallback_seed: Some(seed),
        ..PredictorConfig::default()
    }
}

fn replay(path: &Path, seed: u64, capacity: usize, limit: usize) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut engine = HistoryEngine::new(engine_config(seed, capacity));
    let mut tracker = RoundTracker::new();
    let metrics = Metrics::new();
    let mut ignored = 0usize;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(round) = FeedClient::handle_text(line, &mut tracker, &metrics) else {
            continue;
        };
        match RoundResult::new(round.round_id, round.dice) {
            Ok(result) => {
                engine.record_result(result);
            }
            Err(e) => {
                warn!("Ignoring invalid round: {}", e);
                ignored += 1;
            }
        }
    }

    let frames = metrics.snapshot();
    print_header(&format!("REPLAY - {}", path.display()));
    println!(
        "Frames: {} read, {} discarded | Rounds: {} kept, {} ignored\n",
        frames.frames_received,
        frames.frames_discarded,
        engine.len(),
        ignored
    );

    print_recent(&engine, limit);
    print_summary(&engine);
    Ok(())
}

fn simulate(rounds: usize, seed: u64) {
    let mut engine = HistoryEngine::new(engine_config(seed, 1000));
    let mut rng = StdRng::seed_from_u64(seed);

    for i in 0..rounds {
        let dice = [rng.gen_range(1..=6), rng.gen_range(1..=6), rng.gen_range(1..=6)];
        if let Ok(mut result) = RoundResult::new(None, dice) {
            result.round_id = Some(dice_predictor::RoundId::Number(i as i64 + 1));
            engine.record_result(result);
        }
    }

    print_header(&format!("SIMULATION - {} fair rounds, seed {}", rounds, seed));
    print_summary(&engine);
}

fn print_header(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("  {}", title);
    println!("{}\n", "=".repeat(70));
}

fn print_recent(engine: &HistoryEngine, limit: usize) {
    if engine.is_empty() {
        println!("No rounds recorded.\n");
        return;
    }

    println!("LAST {} ROUNDS (newest first)", limit.min(engine.len()));
    println!("{}", "-".repeat(70));
    for round in engine.history().rev().take(limit) {
        let outcome = match round.outcome {
            Outcome::High => round.outcome.to_string().green(),
            Outcome::Low => round.outcome.to_string().red(),
        };
        let verdict = match round.was_correct {
            Some(true) => "correct".green(),
            Some(false) => "wrong".red(),
            None => "-".dimmed(),
        };
        let predicted = round
            .predicted_outcome
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{:<12} {:?} = {:>2} {:<5} | predicted {:<5} {}",
            round.round_label(),
            round.dice,
            round.total,
            outcome,
            predicted,
            verdict
        );
    }
    println!();
}

fn print_summary(engine: &HistoryEngine) {
    let stats = engine.stats();
    let prediction = engine.current_prediction();

    println!("Accuracy:");
    println!("  Correct:    {}", stats.correct);
    println!("  Incorrect:  {}", stats.incorrect);
    println!("  Win Rate:   {}", format!("{:.1}%", stats.win_rate * 100.0).bold());

    println!("\nHeuristic Weights:");
    for w in engine.weights() {
        let hit_rate = w
            .hit_rate
            .map(|r| format!("{:.0}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<14} weight {:.3} | recent hit rate {:>4} over {} rounds",
            w.heuristic, w.weight, hit_rate, w.samples
        );
    }
    if engine.heuristic_errors() > 0 {
        println!("  ({} heuristic errors ignored)", engine.heuristic_errors());
    }

    println!(
        "\nNext: {} at {} ({})\n",
        prediction.outcome.to_string().bold(),
        prediction.confidence_percent(),
        prediction.rationale
    );
}
