//! Repeating subsequence heuristic
//!
//! Finds the most frequent fixed-width motif in the recent window and bets on
//! the tail following it.

use super::{Heuristic, HeuristicError, Vote};
use crate::types::Outcome;
use std::collections::HashMap;

pub struct PatternHeuristic {
    window: usize,
    len: usize,
    min_repeats: usize,
}

/// Most frequent motif in a window
#[derive(Debug, Clone, PartialEq)]
pub struct Motif {
    pub pattern: Vec<Outcome>,
    pub count: usize,
}

impl PatternHeuristic {
    pub fn new(window: usize, len: usize, min_repeats: usize) -> Self {
        Self {
            window,
            len,
            min_repeats,
        }
    }

    /// Most frequent length-`len` subsequence. Ties go to the motif seen most
    /// recently.
    pub fn dominant_motif(&self, recent: &[Outcome]) -> Option<Motif> {
        if recent.len() < self.len {
            return None;
        }

        // motif -> (count, start index of latest occurrence)
        let mut counts: HashMap<&[Outcome], (usize, usize)> = HashMap::new();
        for (start, motif) in recent.windows(self.len).enumerate() {
            let entry = counts.entry(motif).or_insert((0, start));
            entry.0 += 1;
            entry.1 = start;
        }

        counts
            .into_iter()
            .max_by(|a, b| (a.1).0.cmp(&(b.1).0).then((a.1).1.cmp(&(b.1).1)))
            .map(|(pattern, (count, _))| Motif {
                pattern: pattern.to_vec(),
                count,
            })
    }
}

impl Heuristic for PatternHeuristic {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn evaluate(&mut self, outcomes: &[Outcome]) -> Result<Option<Vote>, HeuristicError> {
        if self.len < 2 || self.window < 2 * self.len {
            return Err(HeuristicError::InvalidWindow {
                heuristic: self.name(),
                detail: format!("len {} with window {}", self.len, self.window),
            });
        }

        let recent = &outcomes[outcomes.len().saturating_sub(self.window)..];
        if recent.len() < 2 * self.len {
            return Ok(None);
        }

        let Some(motif) = self.dominant_motif(recent) else {
            return Ok(None);
        };
        if motif.count < self.min_repeats {
            return Ok(None);
        }

        let confidence = (0.35 + 0.05 * (motif.count - self.min_repeats) as f64).min(0.7);
        let tail_full = &recent[recent.len() - self.len..];
        let tail_partial = &recent[recent.len() - (self.len - 1)..];

        let vote = if tail_full == motif.pattern.as_slice() {
            // Motif just completed, expect it to start over
            Some(motif.pattern[0])
        } else if tail_partial == &motif.pattern[..self.len - 1] {
            Some(motif.pattern[self.len - 1])
        } else {
            None
        };

        Ok(vote.map(|outcome| Vote::new(outcome, confidence)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::parse_outcomes;

    #[test]
    fn test_dominant_motif() {
        let h = PatternHeuristic::new(30, 3, 3);
        let motif = h.dominant_motif(&parse_outcomes("HHLHHLHHL")).unwrap();
        assert_eq!(motif.pattern, parse_outcomes("HHL"));
        assert_eq!(motif.count, 3);
    }

    #[test]
    fn test_tie_prefers_latest_occurrence() {
        let h = PatternHeuristic::new(30, 2, 1);
        // HL and LH both appear twice; LH occurs last
        let motif = h.dominant_motif(&parse_outcomes("HLHLH")).unwrap();
        assert_eq!(motif.pattern, parse_outcomes("LH"));
    }

    #[test]
    fn test_completes_motif() {
        let mut h = PatternHeuristic::new(30, 3, 3);
        // Period-3 sequence ending in HH, next is L
        let vote = h.evaluate(&parse_outcomes("HHLHHLHHLHH")).unwrap().unwrap();
        assert_eq!(vote.outcome, Outcome::Low);
    }

    #[test]
    fn test_restarts_completed_motif() {
        let mut h = PatternHeuristic::new(30, 3, 3);
        let vote = h.evaluate(&parse_outcomes("LLLHHLHHLHHL")).unwrap().unwrap();
        assert_eq!(vote.outcome, Outcome::High);
        assert!((vote.confidence - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_short_history_abstains() {
        let mut h = PatternHeuristic::new(30, 3, 3);
        assert_eq!(h.evaluate(&parse_outcomes("HHLHH")).unwrap(), None);
    }

    #[test]
    fn test_rare_motif_abstains() {
        let mut h = PatternHeuristic::new(30, 3, 3);
        assert_eq!(h.evaluate(&parse_outcomes("HHLLHL")).unwrap(), None);
    }
}
