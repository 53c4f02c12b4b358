//! Low-information fallback
//!
//! Coin flip with a fixed low confidence. The random source is injected so
//! replays and tests can pin it.

use super::{Heuristic, HeuristicError, Vote};
use crate::types::Outcome;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub struct RandomFallback {
    rng: Box<dyn RngCore + Send + Sync>,
    confidence: f64,
}

impl RandomFallback {
    pub fn new(rng: Box<dyn RngCore + Send + Sync>, confidence: f64) -> Self {
        Self { rng, confidence }
    }

    pub fn seeded(seed: u64, confidence: f64) -> Self {
        Self::new(Box::new(StdRng::seed_from_u64(seed)), confidence)
    }

    pub fn from_entropy(confidence: f64) -> Self {
        Self::new(Box::new(StdRng::from_entropy()), confidence)
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl Heuristic for RandomFallback {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn evaluate(&mut self, outcomes: &[Outcome]) -> Result<Option<Vote>, HeuristicError> {
        if outcomes.is_empty() {
            return Ok(None);
        }
        let outcome = if self.rng.gen_bool(0.5) {
            Outcome::High
        } else {
            Outcome::Low
        };
        Ok(Some(Vote::new(outcome, self.confidence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::parse_outcomes;

    #[test]
    fn test_same_seed_same_votes() {
        let outcomes = parse_outcomes("HLH");
        let mut a = RandomFallback::seeded(7, 0.1);
        let mut b = RandomFallback::seeded(7, 0.1);
        for _ in 0..32 {
            assert_eq!(a.evaluate(&outcomes).unwrap(), b.evaluate(&outcomes).unwrap());
        }
    }

    #[test]
    fn test_fixed_confidence() {
        let mut h = RandomFallback::seeded(1, 0.1);
        let vote = h.evaluate(&parse_outcomes("H")).unwrap().unwrap();
        assert!((vote.confidence - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_no_history_abstains() {
        let mut h = RandomFallback::seeded(1, 0.1);
        assert_eq!(h.evaluate(&[]).unwrap(), None);
    }

    #[test]
    fn test_both_labels_drawn() {
        let outcomes = parse_outcomes("H");
        let mut h = RandomFallback::seeded(42, 0.1);
        let votes: Vec<_> = (0..64)
            .filter_map(|_| h.evaluate(&outcomes).unwrap())
            .map(|v| v.outcome)
            .collect();
        assert!(votes.contains(&Outcome::High));
        assert!(votes.contains(&Outcome::Low));
    }
}
