//! Recency bias (mean reversion) heuristic
//!
//! When one label dominates the recent window, bet on the other one.

use super::{Heuristic, HeuristicError, Vote};
use crate::types::Outcome;

pub struct RecencyBiasHeuristic {
    window: usize,
    min_samples: usize,
    threshold: f64,
}

impl RecencyBiasHeuristic {
    pub fn new(window: usize, min_samples: usize, threshold: f64) -> Self {
        Self {
            window,
            min_samples,
            threshold,
        }
    }
}

impl Heuristic for RecencyBiasHeuristic {
    fn name(&self) -> &'static str {
        "recency_bias"
    }

    fn evaluate(&mut self, outcomes: &[Outcome]) -> Result<Option<Vote>, HeuristicError> {
        if self.window == 0 || self.min_samples > self.window {
            return Err(HeuristicError::InvalidWindow {
                heuristic: self.name(),
                detail: format!("min_samples {} > window {}", self.min_samples, self.window),
            });
        }
        if !(0.5..=1.0).contains(&self.threshold) {
            return Err(HeuristicError::InvalidWindow {
                heuristic: self.name(),
                detail: format!("threshold {} outside 0.5-1.0", self.threshold),
            });
        }

        let recent = &outcomes[outcomes.len().saturating_sub(self.window)..];
        if recent.len() < self.min_samples.max(1) {
            return Ok(None);
        }

        let highs = recent.iter().filter(|o| **o == Outcome::High).count();
        let high_share = highs as f64 / recent.len() as f64;

        let (majority, share) = if high_share >= 0.5 {
            (Outcome::High, high_share)
        } else {
            (Outcome::Low, 1.0 - high_share)
        };

        if share < self.threshold {
            return Ok(None);
        }

        let confidence = (0.4 + 2.0 * (share - self.threshold)).min(0.85);
        Ok(Some(Vote::new(majority.opposite(), confidence)))
    }
}
