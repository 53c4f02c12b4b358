//! History engine
//!
//! Owns the bounded round log, the current prediction, accuracy counters and
//! per-heuristic performance weights. `record_result` is the only mutating
//! entry point and completes every derived update before returning, so a
//! reader holding the engine lock never sees a half-applied round.
//!
//! Scoring convention: the prediction made after round N is stored on, and
//! scored against, round N+1.

use crate::config::PredictorConfig;
use crate::heuristics::{default_registry, Heuristic, HeuristicError, RandomFallback, Vote};
use crate::types::{AccuracyStats, Outcome, Prediction, PredictedOutcome, RoundResult, VoteRecord};
use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Lifecycle of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Uninitialized,
    Active,
}

/// Rolling hit/miss record and ensemble weight for one heuristic
#[derive(Debug, Clone)]
struct PerformanceTracker {
    hits: VecDeque<bool>,
    weight: f64,
}

impl PerformanceTracker {
    fn hit_rate(&self) -> Option<f64> {
        if self.hits.is_empty() {
            return None;
        }
        let correct = self.hits.iter().filter(|h| **h).count();
        Some(correct as f64 / self.hits.len() as f64)
    }
}

/// Weight and recent accuracy of a heuristic, for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicWeight {
    pub heuristic: String,
    pub weight: f64,
    /// `None` until the heuristic has voted on a settled round
    pub hit_rate: Option<f64>,
    pub samples: usize,
}

pub struct HistoryEngine {
    config: PredictorConfig,
    log: VecDeque<RoundResult>,
    prediction: Prediction,
    stats: AccuracyStats,
    heuristics: Vec<Box<dyn Heuristic>>,
    fallback: RandomFallback,
    performance: Vec<PerformanceTracker>,
    /// Votes each registry heuristic cast for the round now pending
    last_votes: Vec<Option<Outcome>>,
    heuristic_errors: u64,
}

impl HistoryEngine {
    /// Engine with the default heuristic registry
    pub fn new(config: PredictorConfig) -> Self {
        let heuristics = default_registry(&config.heuristics);
        let confidence = config.heuristics.fallback_confidence;
        let fallback = match config.fallback_seed {
            Some(seed) => RandomFallback::seeded(seed, confidence),
            None => RandomFallback::from_entropy(confidence),
        };
        Self::with_heuristics(config, heuristics, fallback)
    }

    /// Engine with an explicit registry and fallback
    pub fn with_heuristics(
        config: PredictorConfig,
        heuristics: Vec<Box<dyn Heuristic>>,
        fallback: RandomFallback,
    ) -> Self {
        let n = heuristics.len().max(1);
        let performance = heuristics
            .iter()
            .map(|_| PerformanceTracker {
                hits: VecDeque::with_capacity(config.performance_window),
                weight: 1.0 / n as f64,
            })
            .collect();
        let last_votes = vec![None; heuristics.len()];

        Self {
            log: VecDeque::with_capacity(config.capacity.min(4096)),
            prediction: Prediction::unknown("No rounds recorded yet"),
            stats: AccuracyStats::default(),
            config,
            heuristics,
            fallback,
            performance,
            last_votes,
            heuristic_errors: 0,
        }
    }

    /// Record a settled round: score the pending prediction, append, update
    /// heuristic weights and compute the next prediction. Returns the round
    /// as stored.
    pub fn record_result(&mut self, mut result: RoundResult) -> RoundResult {
        // 1. Score the prediction that was current before this round
        if let Some(predicted) = self.prediction.outcome.outcome() {
            let correct = predicted == result.outcome;
            result.predicted_outcome = Some(predicted);
            result.was_correct = Some(correct);
            self.stats.record(correct);
        } else {
            result.predicted_outcome = None;
            result.was_correct = None;
        }

        // 2. Append and evict
        self.log.push_back(result.clone());
        while self.log.len() > self.config.capacity {
            self.log.pop_front();
        }

        // 3. Heuristic performance
        self.update_performance(result.outcome);

        // 4. Next prediction
        self.prediction = self.predict();

        debug!(
            "Round {} total={} {} | next: {} ({})",
            result.round_label(),
            result.total,
            result.outcome,
            self.prediction.outcome,
            self.prediction.rationale
        );

        result
    }

    pub fn current_prediction(&self) -> &Prediction {
        &self.prediction
    }

    pub fn stats(&self) -> &AccuracyStats {
        &self.stats
    }

    pub fn state(&self) -> EngineState {
        if self.log.is_empty() {
            EngineState::Uninitialized
        } else {
            EngineState::Active
        }
    }

    /// Rounds oldest-first
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &RoundResult> + ExactSizeIterator {
        self.log.iter()
    }

    pub fn latest(&self) -> Option<&RoundResult> {
        self.log.back()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Heuristic errors swallowed since startup
    pub fn heuristic_errors(&self) -> u64 {
        self.heuristic_errors
    }

    pub fn weights(&self) -> Vec<HeuristicWeight> {
        self.heuristics
            .iter()
            .zip(&self.performance)
            .map(|(h, p)| HeuristicWeight {
                heuristic: h.name().to_string(),
                weight: p.weight,
                hit_rate: p.hit_rate(),
                samples: p.hits.len(),
            })
            .collect()
    }

    fn update_performance(&mut self, actual: Outcome) {
        let window = self.config.performance_window.max(1);
        for (tracker, vote) in self.performance.iter_mut().zip(self.last_votes.iter_mut()) {
            if let Some(voted) = vote.take() {
                tracker.hits.push_back(voted == actual);
                while tracker.hits.len() > window {
                    tracker.hits.pop_front();
                }
            }
        }

        let n = self.performance.len();
        if n == 0 {
            return;
        }
        let neutral = 1.0 / n as f64;

        let perf: Vec<f64> = self
            .performance
            .iter()
            .map(|p| p.hit_rate().unwrap_or(0.5))
            .collect();
        let perf_sum: f64 = perf.iter().sum();

        let lr = self.config.weight_learning_rate;
        let min_w = neutral * self.config.min_weight_factor;
        let max_w = neutral * self.config.max_weight_factor;
        for (tracker, p) in self.performance.iter_mut().zip(&perf) {
            let target = if perf_sum > 0.0 { p / perf_sum } else { neutral };
            tracker.weight = ((1.0 - lr) * tracker.weight + lr * target).max(min_w).min(max_w);
        }

        let total: f64 = self.performance.iter().map(|p| p.weight).sum();
        if total > 0.0 {
            for tracker in &mut self.performance {
                tracker.weight /= total;
            }
        }
    }

    fn predict(&mut self) -> Prediction {
        if self.log.len() < self.config.min_history {
            return Prediction::unknown(format!(
                "Need {} rounds, have {}",
                self.config.min_history,
                self.log.len()
            ));
        }

        let outcomes: Vec<Outcome> = self.log.iter().map(|r| r.outcome).collect();

        let mut votes: Vec<VoteRecord> = Vec::new();
        for (i, heuristic) in self.heuristics.iter_mut().enumerate() {
            let vote = match evaluate_isolated(heuristic.as_mut(), &outcomes) {
                Ok(vote) => vote,
                Err(e) => {
                    warn!("Heuristic {} failed, ignoring this round: {}", heuristic.name(), e);
                    self.heuristic_errors += 1;
                    None
                }
            };
            self.last_votes[i] = vote.map(|v| v.outcome);
            if let Some(Vote { outcome, confidence }) = vote {
                votes.push(VoteRecord {
                    heuristic: heuristic.name().to_string(),
                    outcome,
                    confidence,
                    weight: self.performance[i].weight,
                });
            }
        }

        if votes.is_empty() {
            return self.fallback_prediction(&outcomes);
        }

        combine(votes)
    }

    fn fallback_prediction(&mut self, outcomes: &[Outcome]) -> Prediction {
        let vote = match evaluate_isolated(&mut self.fallback, outcomes) {
            Ok(vote) => vote,
            Err(e) => {
                warn!("Fallback heuristic failed: {}", e);
                self.heuristic_errors += 1;
                None
            }
        };

        match vote {
            Some(vote) => Prediction {
                outcome: vote.outcome.into(),
                confidence: self.fallback.confidence(),
                rationale: "No pattern detected, coin flip".to_string(),
                votes: vec![VoteRecord {
                    heuristic: self.fallback.name().to_string(),
                    outcome: vote.outcome,
                    confidence: vote.confidence,
                    weight: 1.0,
                }],
                made_at: Utc::now(),
            },
            None => Prediction::unknown("No heuristic produced a vote"),
        }
    }
}

/// Run one heuristic with a panic reported as `HeuristicError::Internal`
fn evaluate_isolated(
    heuristic: &mut dyn Heuristic,
    outcomes: &[Outcome],
) -> Result<Option<Vote>, HeuristicError> {
    match panic::catch_unwind(AssertUnwindSafe(|| heuristic.evaluate(outcomes))) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(HeuristicError::Internal(format!("panicked: {}", detail)))
        }
    }
}

/// Weighted vote tally. Ties and empty tallies yield `Unknown`.
fn combine(votes: Vec<VoteRecord>) -> Prediction {
    let mut high = 0.0;
    let mut low = 0.0;
    for vote in &votes {
        let score = vote.confidence * vote.weight;
        match vote.outcome {
            Outcome::High => high += score,
            Outcome::Low => low += score,
        }
    }

    let total = high + low;
    if total <= 0.0 || high == low {
        return Prediction {
            votes,
            ..Prediction::unknown("Heuristics cancel out")
        };
    }

    let (winner, winning) = if high > low {
        (Outcome::High, high)
    } else {
        (Outcome::Low, low)
    };

    let backers: Vec<&str> = votes
        .iter()
        .filter(|v| v.outcome == winner)
        .map(|v| v.heuristic.as_str())
        .collect();
    let dissent = votes.len() - backers.len();
    let rationale = if dissent == 0 {
        format!("{} via {}", winner, backers.join(", "))
    } else {
        format!("{} via {} ({} dissenting)", winner, backers.join(", "), dissent)
    };

    Prediction {
        outcome: PredictedOutcome::from(winner),
        confidence: winning / total,
        rationale,
        votes,
        made_at: Utc::now(),
    }
}
