//! JSON status endpoints

use crate::api::server::{AppState, StatusSnapshot};
use crate::services::MetricsSnapshot;
use crate::types::RoundResult;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Current prediction, latest round and accuracy
pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.status().await)
}

/// Query parameters for the history listing
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of rounds to return, newest first
    pub limit: Option<usize>,
}

/// History response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Rounds currently held
    pub total: usize,
    pub capacity: usize,
    /// Newest first
    pub rounds: Vec<RoundResult>,
}

/// Bounded round log, most recent first
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let engine = state.engine.read().await;
    let rounds = engine
        .history()
        .rev()
        .take(query.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Json(HistoryResponse {
        total: engine.len(),
        capacity: engine.capacity(),
        rounds,
    })
}

/// Service metrics snapshot
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
