//! Axum server setup and shared state

use crate::api::routes;
use crate::api::ws::ws_handler;
use crate::engine::{EngineState, HeuristicWeight, HistoryEngine};
use crate::services::{CompletedRound, Metrics};
use crate::types::{AccuracyStats, Prediction, RoundResult};
use crate::Config;
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Everything a reader needs about the current state, taken under one lock
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: EngineState,
    /// Most recent settled round
    pub latest: Option<RoundResult>,
    /// Prediction for the next round
    pub prediction: Prediction,
    pub stats: AccuracyStats,
    pub weights: Vec<HeuristicWeight>,
    pub history_len: usize,
    pub capacity: usize,
}

impl StatusSnapshot {
    pub fn from_engine(engine: &HistoryEngine) -> Self {
        Self {
            state: engine.state(),
            latest: engine.latest().cloned(),
            prediction: engine.current_prediction().clone(),
            stats: engine.stats().clone(),
            weights: engine.weights(),
            history_len: engine.len(),
            capacity: engine.capacity(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Written only by the recorder; readers take the read lock for the
    /// whole snapshot so they never see a half-recorded round
    pub engine: Arc<RwLock<HistoryEngine>>,
    pub metrics: Metrics,
    /// Broadcast channel for status updates after each round
    pub status_tx: broadcast::Sender<StatusSnapshot>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_engine(HistoryEngine::new(config.predictor.clone()))
    }

    pub fn with_engine(engine: HistoryEngine) -> Self {
        let (status_tx, _) = broadcast::channel(16);
        Self {
            engine: Arc::new(RwLock::new(engine)),
            metrics: Metrics::new(),
            status_tx,
        }
    }

    /// Subscribe to status updates
    pub fn subscribe(&self) -> broadcast::Receiver<StatusSnapshot> {
        self.status_tx.subscribe()
    }

    pub async fn status(&self) -> StatusSnapshot {
        StatusSnapshot::from_engine(&*self.engine.read().await)
    }

    /// Record a settled round and broadcast the new status. Invalid rounds
    /// are logged and dropped.
    pub async fn record(&self, round: CompletedRound) -> Option<RoundResult> {
        let result = match RoundResult::new(round.round_id, round.dice) {
            Ok(r) => r,
            Err(e) => {
                warn!("Ignoring invalid round: {}", e);
                self.metrics.inc_rounds_ignored();
                return None;
            }
        };

        let (stored, snapshot) = {
            let mut engine = self.engine.write().await;
            let stored = engine.record_result(result);
            self.metrics.set_heuristic_errors(engine.heuristic_errors());
            (stored, StatusSnapshot::from_engine(&engine))
        };
        self.metrics.inc_rounds_recorded();

        info!(
            "Round #{}: {:?} = {} ({}) | next: {} {} | win rate {} ({}/{})",
            stored.round_label(),
            stored.dice,
            stored.total,
            stored.outcome,
            snapshot.prediction.outcome,
            snapshot.prediction.confidence_percent(),
            snapshot.stats.win_rate_percent(),
            snapshot.stats.correct,
            snapshot.stats.total()
        );

        // No subscribers is fine
        let _ = self.status_tx.send(snapshot);
        Some(stored)
    }
}

/// Consume settled rounds one at a time until the feed side hangs up
pub async fn run_recorder(state: AppState, mut round_rx: mpsc::Receiver<CompletedRound>) {
    while let Some(round) = round_rx.recv().await {
        state.record(round).await;
    }
    info!("Round channel closed, recorder stopping");
}

/// Create the Axum application with all routes
pub fn create_app(state: AppState) -> Router {
    // Read-only API, any origin may fetch it
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let api_routes = Router::new()
        .route("/status", get(routes::status::get_status))
        .route("/history", get(routes::status::get_history))
        .route("/metrics", get(routes::status::get_metrics));

    Router::new()
        .nest("/api", api_routes)
        .route("/", get(routes::pages::index))
        .route("/status", get(routes::status::get_status))
        .route("/history", get(routes::pages::history_page))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictorConfig;
    use crate::types::RoundId;

    fn state() -> AppState {
        AppState::with_engine(HistoryEngine::new(PredictorConfig {
            fallback_seed: Some(9),
            ..PredictorConfig::default()
        }))
    }

    fn completed(id: i64, dice: [u8; 3]) -> CompletedRound {
        CompletedRound {
            round_id: Some(RoundId::Number(id)),
            dice,
        }
    }

    #[tokio::test]
    async fn test_record_updates_status_and_broadcasts() {
        let state = state();
        let mut rx = state.subscribe();

        let stored = state.record(completed(1, [6, 6, 1])).await.unwrap();
        assert_eq!(stored.total, 13);

        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.state, EngineState::Active);
        assert_eq!(pushed.history_len, 1);
        assert_eq!(pushed.latest.unwrap().round_id, Some(RoundId::Number(1)));

        let status = state.status().await;
        assert_eq!(status.history_len, 1);
        assert_eq!(state.metrics.snapshot().rounds_recorded, 1);
    }

    #[tokio::test]
    async fn test_invalid_round_ignored() {
        let state = state();
        assert!(state.record(completed(1, [0, 6, 1])).await.is_none());
        assert_eq!(state.status().await.history_len, 0);
        assert_eq!(state.status().await.state, EngineState::Uninitialized);
        assert_eq!(state.metrics.snapshot().rounds_ignored, 1);
    }

    #[tokio::test]
    async fn test_recorder_drains_channel_in_order() {
        let state = state();
        let (tx, rx) = mpsc::channel(8);
        for i in 0..5 {
            tx.send(completed(i, [1, 2, (i as u8 % 6) + 1])).await.unwrap();
        }
        drop(tx);

        run_recorder(state.clone(), rx).await;

        let engine = state.engine.read().await;
        let ids: Vec<_> = engine.history().map(|r| r.round_id.clone()).collect();
        let expected: Vec<_> = (0..5).map(|i| Some(RoundId::Number(i))).collect();
        assert_eq!(ids, expected);
    }

    struct Panicking;

    impl crate::heuristics::Heuristic for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn evaluate(
            &mut self,
            outcomes: &[crate::types::Outcome],
        ) -> Result<Option<crate::heuristics::Vote>, crate::heuristics::HeuristicError> {
            let past_end = outcomes[outcomes.len() + 1];
            Ok(Some(crate::heuristics::Vote::new(past_end, 0.5)))
        }
    }

    #[tokio::test]
    async fn test_recorder_survives_panicking_heuristic() {
        let heuristics: Vec<Box<dyn crate::heuristics::Heuristic>> = vec![Box::new(Panicking)];
        let engine = HistoryEngine::with_heuristics(
            PredictorConfig::default(),
            heuristics,
            crate::heuristics::RandomFallback::seeded(3, 0.1),
        );
        let state = AppState::with_engine(engine);
        let (tx, rx) = mpsc::channel(8);
        for i in 0..6 {
            tx.send(completed(i, [6, 6, 6])).await.unwrap();
        }
        drop(tx);

        tokio::spawn(run_recorder(state.clone(), rx)).await.unwrap();

        let status = state.status().await;
        assert_eq!(status.history_len, 6);
        assert!(!status.prediction.is_unknown());
        assert_eq!(state.metrics.snapshot().heuristic_errors, 4);
    }

    async fn get(app: Router, uri: &str) -> (axum::http::StatusCode, String) {
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use tower::ServiceExt;

        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_routes_serve_state() {
        let state = state();
        state.record(completed(100, [1, 1, 2])).await;
        state.record(completed(101, [6, 5, 4])).await;
        let app = create_app(state);

        let (code, body) = get(app.clone(), "/health").await;
        assert!(code.is_success());
        assert_eq!(body, "OK");

        let (code, body) = get(app.clone(), "/status").await;
        assert!(code.is_success());
        let status: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(status["history_len"], 2);
        assert_eq!(status["latest"]["round_id"], 101);
        assert_eq!(status["prediction"]["outcome"], "Unknown");

        let (_, body) = get(app.clone(), "/api/history?limit=1").await;
        let history: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(history["total"], 2);
        assert_eq!(history["rounds"].as_array().unwrap().len(), 1);
        assert_eq!(history["rounds"][0]["round_id"], 101);

        let (_, body) = get(app.clone(), "/history").await;
        let newest = body.find("Round: 101").unwrap();
        let oldest = body.find("Round: 100").unwrap();
        assert!(newest < oldest);

        let (_, body) = get(app, "/api/metrics").await;
        let metrics: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(metrics["rounds_recorded"], 2);
    }
}
