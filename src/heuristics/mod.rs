//! Next-round heuristics
//!
//! Each heuristic looks at a suffix of the outcome log and either abstains or
//! votes High/Low with a base confidence. The history engine weights and
//! combines the votes.

pub mod alternation;
pub mod fallback;
pub mod pattern;
pub mod recency_bias;
pub mod streak;

pub use alternation::AlternationHeuristic;
pub use fallback::RandomFallback;
pub use pattern::PatternHeuristic;
pub use recency_bias::RecencyBiasHeuristic;
pub use streak::StreakHeuristic;

use crate::config::HeuristicConfig;
use crate::types::Outcome;
use thiserror::Error;

/// A heuristic's opinion about the next round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    pub outcome: Outcome,
    /// In (0, 1]
    pub confidence: f64,
}

impl Vote {
    pub fn new(outcome: Outcome, confidence: f64) -> Self {
        Self {
            outcome,
            confidence: confidence.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeuristicError {
    #[error("{heuristic}: invalid window configuration ({detail})")]
    InvalidWindow {
        heuristic: &'static str,
        detail: String,
    },
    #[error("{0}")]
    Internal(String),
}

/// Trait for next-round heuristics
pub trait Heuristic: Send + Sync {
    /// Name used in rationales, weights and logs
    fn name(&self) -> &'static str;

    /// Inspect the outcome log (oldest first). `Ok(None)` means no opinion.
    fn evaluate(&mut self, outcomes: &[Outcome]) -> Result<Option<Vote>, HeuristicError>;
}

/// The fixed heuristic registry, in evaluation order. The random fallback is
/// not part of it: the engine only consults the fallback when none of these
/// vote.
pub fn default_registry(config: &HeuristicConfig) -> Vec<Box<dyn Heuristic>> {
    vec![
        Box::new(StreakHeuristic::new(
            config.streak_break_threshold,
            config.streak_follow_min,
        )),
        Box::new(AlternationHeuristic::new(config.alternation_min_len)),
        Box::new(RecencyBiasHeuristic::new(
            config.recency_window,
            config.recency_min_samples,
            config.recency_threshold,
        )),
        Box::new(PatternHeuristic::new(
            config.pattern_window,
            config.pattern_len,
            config.pattern_min_repeats,
        )),
    ]
}

/// Length of the run of identical outcomes at the tail
pub(crate) fn tail_run(outcomes: &[Outcome]) -> usize {
    let Some(last) = outcomes.last() else {
        return 0;
    };
    outcomes.iter().rev().take_while(|o| *o == last).count()
}

/// Length of the strictly alternating run at the tail
pub(crate) fn alternating_run(outcomes: &[Outcome]) -> usize {
    if outcomes.is_empty() {
        return 0;
    }
    let mut run = 1;
    for pair in outcomes.windows(2).rev() {
        if pair[0] == pair[1] {
            break;
        }
        run += 1;
    }
    run
}

#[cfg(test)]
pub(crate) fn parse_outcomes(s: &str) -> Vec<Outcome> {
    s.chars()
        .filter_map(|c| match c {
            'H' => Some(Outcome::High),
            'L' => Some(Outcome::Low),
            _ => None,
        })
        .collect()
}
