//! Streak heuristic
//!
//! Long runs are bet to break, short runs are bet to continue.

use super::{tail_run, Heuristic, HeuristicError, Vote};
use crate::types::Outcome;

pub struct StreakHeuristic {
    break_threshold: usize,
    follow_min: usize,
}

impl StreakHeuristic {
    pub fn new(break_threshold: usize, follow_min: usize) -> Self {
        Self {
            break_threshold,
            follow_min,
        }
    }
}

impl Heuristic for StreakHeuristic {
    fn name(&self) -> &'static str {
        "streak"
    }

    fn evaluate(&mut self, outcomes: &[Outcome]) -> Result<Option<Vote>, HeuristicError> {
        if self.follow_min == 0 || self.follow_min >= self.break_threshold {
            return Err(HeuristicError::InvalidWindow {
                heuristic: self.name(),
                detail: format!(
                    "follow_min {} must be in 1..{}",
                    self.follow_min, self.break_threshold
                ),
            });
        }

        let Some(&last) = outcomes.last() else {
            return Ok(None);
        };
        let run = tail_run(outcomes);

        if run >= self.break_threshold {
            let confidence = (0.5 + 0.08 * (run - self.break_threshold + 1) as f64).min(0.9);
            return Ok(Some(Vote::new(last.opposite(), confidence)));
        }

        if run >= self.follow_min {
            let confidence = 0.3 + 0.05 * (run - self.follow_min) as f64;
            return Ok(Some(Vote::new(last, confidence)));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicConfig;
    use crate::heuristics::parse_outcomes;

    fn heuristic() -> StreakHeuristic {
        let config = HeuristicConfig::default();
        StreakHeuristic::new(config.streak_break_threshold, config.streak_follow_min)
    }

    #[test]
    fn test_four_highs_bet_on_break() {
        let vote = heuristic()
            .evaluate(&parse_outcomes("HHHH"))
            .unwrap()
            .unwrap();
        assert_eq!(vote.outcome, Outcome::Low);
        assert!(vote.confidence > HeuristicConfig::default().fallback_confidence);
        assert!((vote.confidence - 0.58).abs() < 1e-9);
    }

    #[test]
    fn test_break_confidence_grows_and_caps() {
        let mut h = heuristic();
        let five = h.evaluate(&parse_outcomes("LLLLL")).unwrap().unwrap();
        let four = h.evaluate(&parse_outcomes("LLLL")).unwrap().unwrap();
        assert_eq!(five.outcome, Outcome::High);
        assert!(five.confidence > four.confidence);

        let long = h.evaluate(&parse_outcomes("HHHHHHHHHHHH")).unwrap().unwrap();
        assert!((long.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_short_run_follows() {
        let mut h = heuristic();
        let vote = h.evaluate(&parse_outcomes("LHH")).unwrap().unwrap();
        assert_eq!(vote.outcome, Outcome::High);
        assert!((vote.confidence - 0.3).abs() < 1e-9);

        let vote = h.evaluate(&parse_outcomes("HLLL")).unwrap().unwrap();
        assert_eq!(vote.outcome, Outcome::Low);
        assert!((vote.confidence - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_single_or_empty_abstains() {
        let mut h = heuristic();
        assert_eq!(h.evaluate(&parse_outcomes("HL")).unwrap(), None);
        assert_eq!(h.evaluate(&[]).unwrap(), None);
    }

    #[test]
    fn test_bad_bands_error() {
        let mut h = StreakHeuristic::new(3, 3);
        assert!(h.evaluate(&parse_outcomes("HHH")).is_err());
    }
}
