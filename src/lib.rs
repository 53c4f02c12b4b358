//! Dice Round Predictor Library
//!
//! Follows a real-time dice game feed, rebuilds settled rounds and keeps a
//! running guess for the next one:
//!
//! 1. **Feed**: a reconnecting WebSocket client decodes round frames and
//!    emits `(round id, three dice)` events.
//! 2. **History engine**: a bounded round log scored by a fixed registry of
//!    heuristics (streak, alternation, recency bias, repeating pattern, random
//!    fallback), combined with weights that follow each heuristic's recent
//!    hit rate.
//!
//! The state is served read-only over HTTP. Nothing is persisted.

pub mod api;
pub mod config;
pub mod engine;
pub mod heuristics;
pub mod services;
pub mod types;

pub use config::{Config, FeedConfig, HeuristicConfig, PredictorConfig};
pub use engine::{EngineState, HistoryEngine};
pub use heuristics::{Heuristic, HeuristicError, Vote};
pub use services::{FeedClient, Metrics};
pub use types::{AccuracyStats, Outcome, PredictedOutcome, Prediction, RoundId, RoundResult};
