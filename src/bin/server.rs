//! Dice Predictor Web Server
//!
//! Follows the live feed and serves the predictor state over HTTP.

use anyhow::Result;
use dice_predictor::api::{create_app, run_recorder, AppState};
use dice_predictor::services::{CompletedRound, FeedClient};
use dice_predictor::Config;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Default to warn, with round-by-round info from this crate.
    // Override with RUST_LOG, e.g. RUST_LOG=debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,dice_predictor=info,dice_server=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Load configuration
    let config = Config::from_env()?;

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║       DICE ROUND PREDICTOR - WEB SERVER                      ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Feed: {:<53} ║", if config.has_feed() { "ENABLED" } else { "DISABLED (set FEED_URL)" });
    println!("║  History capacity: {:<41} ║", config.predictor.capacity);
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let state = AppState::new(&config);

    // Feed -> recorder, one round at a time
    let (round_tx, round_rx) = mpsc::channel::<CompletedRound>(64);

    let recorder_state = state.clone();
    tokio::spawn(async move {
        run_recorder(recorder_state, round_rx).await;
    });

    if config.has_feed() {
        let feed_config = config.feed.clone();
        let feed_metrics = state.metrics.clone();
        tokio::spawn(async move {
            info!("Starting feed WebSocket...");
            FeedClient::run(feed_config, round_tx, feed_metrics).await;
        });
    } else {
        warn!("FEED_URL not set, serving an empty history");
        drop(round_tx);
    }

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    println!();
    println!("  Status:    http://localhost:{}/status", config.port);
    println!("  History:   http://localhost:{}/history", config.port);
    println!("  WebSocket: ws://localhost:{}/ws", config.port);
    println!("  Health:    http://localhost:{}/health", config.port);
    println!();

    axum::serve(listener, app).await?;

    Ok(())
}
