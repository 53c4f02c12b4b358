//! Configuration management for the dice predictor

use anyhow::{Context, Result};
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Service configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen port
    pub port: u16,

    /// Upstream feed settings
    pub feed: FeedConfig,

    /// History engine and heuristic settings
    pub predictor: PredictorConfig,
}

/// Upstream WebSocket feed settings
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Full WebSocket URL, including any token query string
    pub url: String,
    /// `Origin` header sent on connect
    pub origin: Option<String>,
    /// `User-Agent` header sent on connect
    pub user_agent: Option<String>,
    /// Frames sent in order right after connecting
    pub handshake: Vec<Value>,
    /// Delay between consecutive handshake frames
    pub handshake_stagger: Duration,
    /// Keepalive ping interval
    pub ping_interval: Duration,
    /// Fixed delay before reconnecting
    pub reconnect_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            origin: None,
            user_agent: None,
            handshake: default_handshake(),
            handshake_stagger: Duration::from_millis(600),
            ping_interval: Duration::from_secs(15),
            reconnect_delay: Duration::from_millis(2500),
        }
    }
}

/// Subscription frames for the dice game and lobby plugins. Any login frame
/// must be supplied through `FEED_HANDSHAKE` since it carries credentials.
pub fn default_handshake() -> Vec<Value> {
    vec![
        serde_json::json!([6, "MiniGame", "taixiuPlugin", { "cmd": 1005 }]),
        serde_json::json!([6, "MiniGame", "lobbyPlugin", { "cmd": 10001 }]),
    ]
}

/// History engine settings
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Maximum rounds kept in the history log
    pub capacity: usize,
    /// Rounds required before any prediction is made
    pub min_history: usize,
    /// Evaluable rounds per heuristic used for its rolling hit rate
    pub performance_window: usize,
    /// How far weights move toward recent performance each round (0.0 - 1.0)
    pub weight_learning_rate: f64,
    /// Weight bounds, as multiples of the neutral weight 1/n
    pub min_weight_factor: f64,
    pub max_weight_factor: f64,
    /// Seed for the fallback heuristic; `None` seeds from entropy
    pub fallback_seed: Option<u64>,
    pub heuristics: HeuristicConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            min_history: 3,
            performance_window: 10,
            weight_learning_rate: 0.3,
            min_weight_factor: 0.25,
            max_weight_factor: 4.0,
            fallback_seed: None,
            heuristics: HeuristicConfig::default(),
        }
    }
}

/// Tuning for the individual heuristics
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    /// Run length at which the streak heuristic bets on a break (default: 4)
    pub streak_break_threshold: usize,
    /// Shortest run the streak heuristic follows (default: 2)
    pub streak_follow_min: usize,
    /// Alternating tail length needed to vote (default: 4)
    pub alternation_min_len: usize,
    /// Recency window (default: 20)
    pub recency_window: usize,
    /// Fewest outcomes the recency heuristic looks at (default: 12)
    pub recency_min_samples: usize,
    /// Majority share that triggers mean reversion (default: 0.65)
    pub recency_threshold: f64,
    /// Outcomes scanned for repeating subsequences (default: 30)
    pub pattern_window: usize,
    /// Subsequence length (default: 3)
    pub pattern_len: usize,
    /// Occurrences needed before a pattern votes (default: 3)
    pub pattern_min_repeats: usize,
    /// Fixed confidence of the random fallback (default: 0.1)
    pub fallback_confidence: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            streak_break_threshold: 4,
            streak_follow_min: 2,
            alternation_min_len: 4,
            recency_window: 20,
            recency_min_samples: 12,
            recency_threshold: 0.65,
            pattern_window: 30,
            pattern_len: 3,
            pattern_min_repeats: 3,
            fallback_confidence: 0.1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let port = parse_var("PORT").unwrap_or(5000);

        let defaults = PredictorConfig::default();
        let predictor = PredictorConfig {
            capacity: parse_var("HISTORY_CAPACITY").unwrap_or(defaults.capacity),
            min_history: parse_var("MIN_HISTORY").unwrap_or(defaults.min_history),
            performance_window: parse_var("PERFORMANCE_WINDOW")
                .unwrap_or(defaults.performance_window),
            weight_learning_rate: parse_var("WEIGHT_LEARNING_RATE")
                .unwrap_or(defaults.weight_learning_rate),
            fallback_seed: parse_var("FALLBACK_SEED"),
            ..defaults
        };

        let feed_defaults = FeedConfig::default();
        let url = env::var("FEED_URL").unwrap_or_default();

        let handshake = match env::var("FEED_HANDSHAKE").ok().filter(|s| !s.is_empty()) {
            Some(raw) => parse_handshake(&raw).context("FEED_HANDSHAKE is not a JSON array")?,
            None => match env::var("FEED_HANDSHAKE_FILE").ok().filter(|s| !s.is_empty()) {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path))?;
                    parse_handshake(&raw)
                        .with_context(|| format!("{} is not a JSON array", path))?
                }
                None => feed_defaults.handshake,
            },
        };

        let feed = FeedConfig {
            url,
            origin: env::var("FEED_ORIGIN").ok().filter(|s| !s.is_empty()),
            user_agent: env::var("FEED_USER_AGENT").ok().filter(|s| !s.is_empty()),
            handshake,
            handshake_stagger: parse_var("HANDSHAKE_STAGGER_MS")
                .map(Duration::from_millis)
                .unwrap_or(feed_defaults.handshake_stagger),
            ping_interval: parse_var("PING_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(feed_defaults.ping_interval),
            reconnect_delay: parse_var("RECONNECT_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(feed_defaults.reconnect_delay),
        };

        let config = Self {
            port,
            feed,
            predictor,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the engine misbehave
    pub fn validate(&self) -> Result<()> {
        if self.predictor.capacity == 0 {
            anyhow::bail!("HISTORY_CAPACITY must be at least 1");
        }
        if self.predictor.min_history == 0 {
            anyhow::bail!("MIN_HISTORY must be at least 1");
        }
        if self.predictor.min_history > self.predictor.capacity {
            anyhow::bail!("MIN_HISTORY cannot exceed HISTORY_CAPACITY");
        }
        if self.predictor.performance_window == 0 {
            anyhow::bail!("PERFORMANCE_WINDOW must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.predictor.weight_learning_rate) {
            anyhow::bail!("WEIGHT_LEARNING_RATE must be between 0 and 1");
        }
        let (min_factor, max_factor) = (
            self.predictor.min_weight_factor,
            self.predictor.max_weight_factor,
        );
        if !(min_factor.is_finite() && max_factor.is_finite())
            || min_factor <= 0.0
            || min_factor > max_factor
        {
            anyhow::bail!("weight factors must be finite with 0 < min <= max");
        }
        Ok(())
    }

    /// Whether a feed URL is configured
    pub fn has_feed(&self) -> bool {
        !self.feed.url.is_empty()
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a JSON array of handshake frames
pub fn parse_handshake(raw: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(frames) => Ok(frames),
        _ => anyhow::bail!("expected a JSON array of frames"),
    }
}
