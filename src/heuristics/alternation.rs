//! Alternation (ping-pong) heuristic

use super::{alternating_run, Heuristic, HeuristicError, Vote};
use crate::types::Outcome;

pub struct AlternationHeuristic {
    min_len: usize,
}

impl AlternationHeuristic {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }
}

impl Heuristic for AlternationHeuristic {
    fn name(&self) -> &'static str {
        "alternation"
    }

    fn evaluate(&mut self, outcomes: &[Outcome]) -> Result<Option<Vote>, HeuristicError> {
        if self.min_len < 2 {
            return Err(HeuristicError::InvalidWindow {
                heuristic: self.name(),
                detail: format!("min_len {} is below 2", self.min_len),
            });
        }

        let run = alternating_run(outcomes);
        if run < self.min_len {
            return Ok(None);
        }
        let Some(&last) = outcomes.last() else {
            return Ok(None);
        };

        let confidence = (0.55 + 0.05 * (run - self.min_len) as f64).min(0.8);
        Ok(Some(Vote::new(last.opposite(), confidence)))
    }
}
