//! Core types for the dice round predictor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Dice totals strictly above this are `High`.
pub const HIGH_THRESHOLD: u8 = 10;

/// Binary label of a settled round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    High,
    Low,
}

impl Outcome {
    /// Label a dice total. 10 is `Low`, 11 is `High`.
    pub fn from_total(total: u8) -> Self {
        if total > HIGH_THRESHOLD {
            Outcome::High
        } else {
            Outcome::Low
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Outcome::High => Outcome::Low,
            Outcome::Low => Outcome::High,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::High => write!(f, "High"),
            Outcome::Low => write!(f, "Low"),
        }
    }
}

/// Round identifier as announced by the feed. Numeric on the wire today,
/// but the feed has sent strings before.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoundId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundId::Number(n) => write!(f, "{}", n),
            RoundId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Rejected round data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRound {
    #[error("die {index} has value {value}, expected 1-6")]
    DieOutOfRange { index: usize, value: u8 },
}

/// One settled round as kept in the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_id: Option<RoundId>,
    pub dice: [u8; 3],
    pub total: u8,
    pub outcome: Outcome,
    /// Prediction that was current before this round arrived
    pub predicted_outcome: Option<Outcome>,
    /// `None` when there was no prediction to score
    pub was_correct: Option<bool>,
    pub received_at: DateTime<Utc>,
}

impl RoundResult {
    pub fn new(round_id: Option<RoundId>, dice: [u8; 3]) -> Result<Self, InvalidRound> {
        for (index, &value) in dice.iter().enumerate() {
            if !(1..=6).contains(&value) {
                return Err(InvalidRound::DieOutOfRange { index, value });
            }
        }

        let total: u8 = dice.iter().sum();
        Ok(Self {
            round_id,
            dice,
            total,
            outcome: Outcome::from_total(total),
            predicted_outcome: None,
            was_correct: None,
            received_at: Utc::now(),
        })
    }

    /// Round id for display, `-` when the feed never announced one
    pub fn round_label(&self) -> String {
        self.round_id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// The engine's guess for the next round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictedOutcome {
    High,
    Low,
    Unknown,
}

impl PredictedOutcome {
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            PredictedOutcome::High => Some(Outcome::High),
            PredictedOutcome::Low => Some(Outcome::Low),
            PredictedOutcome::Unknown => None,
        }
    }
}

impl From<Outcome> for PredictedOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::High => PredictedOutcome::High,
            Outcome::Low => PredictedOutcome::Low,
        }
    }
}

impl fmt::Display for PredictedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictedOutcome::High => write!(f, "High"),
            PredictedOutcome::Low => write!(f, "Low"),
            PredictedOutcome::Unknown => write!(f, "?"),
        }
    }
}

/// A single heuristic's contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub heuristic: String,
    pub outcome: Outcome,
    pub confidence: f64,
    /// Ensemble weight applied to this vote
    pub weight: f64,
}

/// Current prediction for the next round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub outcome: PredictedOutcome,
    /// 0.0 - 1.0
    pub confidence: f64,
    /// Human-readable explanation, not used by any logic
    pub rationale: String,
    pub votes: Vec<VoteRecord>,
    /// Wall-clock metadata, ignored by equality
    pub made_at: DateTime<Utc>,
}

impl PartialEq for Prediction {
    fn eq(&self, other: &Self) -> bool {
        self.outcome == other.outcome
            && self.confidence == other.confidence
            && self.rationale == other.rationale
            && self.votes == other.votes
    }
}

impl Prediction {
    pub fn unknown(rationale: impl Into<String>) -> Self {
        Self {
            outcome: PredictedOutcome::Unknown,
            confidence: 0.0,
            rationale: rationale.into(),
            votes: Vec::new(),
            made_at: Utc::now(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.outcome == PredictedOutcome::Unknown
    }

    /// Confidence formatted as a whole percentage
    pub fn confidence_percent(&self) -> String {
        format!("{:.0}%", self.confidence * 100.0)
    }
}

/// Process-lifetime prediction accuracy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub correct: u64,
    pub incorrect: u64,
    pub win_rate: f64,
}

impl AccuracyStats {
    pub fn record(&mut self, was_correct: bool) {
        if was_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
        let total = self.total();
        self.win_rate = if total == 0 {
            0.0
        } else {
            self.correct as f64 / total as f64
        };
    }

    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }

    pub fn win_rate_percent(&self) -> String {
        format!("{:.0}%", self.win_rate * 100.0)
    }
}
