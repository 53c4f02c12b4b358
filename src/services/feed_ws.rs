//! Upstream dice feed WebSocket client
//!
//! Connects to the game feed, replays the handshake, keeps the socket alive
//! with pings and forwards settled rounds to the recorder. Reconnects after a
//! fixed delay for as long as the round channel is open.

use crate::config::FeedConfig;
use crate::services::frames::{decode_frame, CompletedRound, FeedFrame, RoundTracker};
use crate::services::metrics::Metrics;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, sleep, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderValue};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Shortest timer period accepted, zero would make `interval` panic
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Real-time dice feed client
pub struct FeedClient;

impl FeedClient {
    /// Run the feed forever, sending settled rounds to `round_tx`.
    /// Returns once the receiving side of `round_tx` is dropped.
    pub async fn run(config: FeedConfig, round_tx: mpsc::Sender<CompletedRound>, metrics: Metrics) {
        let mut tracker = RoundTracker::new();

        loop {
            match Self::run_connection(&config, &mut tracker, &round_tx, &metrics).await {
                Ok(()) => {
                    info!("Feed WebSocket closed, reconnecting...");
                }
                Err(e) => {
                    warn!("Feed WebSocket error: {:#}, reconnecting...", e);
                }
            }

            if round_tx.is_closed() {
                info!("Round channel closed, shutting down feed WebSocket");
                break;
            }

            metrics.inc_feed_reconnects();
            sleep(config.reconnect_delay).await;
        }
    }

    /// Run a single connection until the server closes it or it errors.
    /// Timers are created per connection, so nothing outlives a reconnect.
    async fn run_connection(
        config: &FeedConfig,
        tracker: &mut RoundTracker,
        round_tx: &mpsc::Sender<CompletedRound>,
        metrics: &Metrics,
    ) -> Result<()> {
        let mut request = config
            .url
            .as_str()
            .into_client_request()
            .context("Invalid feed URL")?;
        if let Some(origin) = &config.origin {
            request
                .headers_mut()
                .insert(header::ORIGIN, HeaderValue::from_str(origin)?);
        }
        if let Some(user_agent) = &config.user_agent {
            request
                .headers_mut()
                .insert(header::USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let (ws_stream, _) = connect_async(request)
            .await
            .context("Failed to connect to feed WebSocket")?;
        let (mut write, mut read) = ws_stream.split();

        info!("Feed WebSocket connected");

        // Handshake frames go out one per tick so the remote is not flooded
        let mut handshake = config.handshake.iter();
        let mut handshake_done = config.handshake.is_empty();
        let mut handshake_tick = interval(config.handshake_stagger.max(MIN_PERIOD));

        let ping_period = config.ping_interval.max(MIN_PERIOD);
        let mut ping_tick = interval_at(Instant::now() + ping_period, ping_period);
        ping_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(round) = Self::handle_text(&text, tracker, metrics) {
                                round_tx
                                    .send(round)
                                    .await
                                    .context("Round channel closed")?;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Feed ping OK");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!("Feed WebSocket closed by server: {:?}", frame);
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }

                _ = handshake_tick.tick(), if !handshake_done => {
                    match handshake.next() {
                        Some(frame) => {
                            write.send(Message::Text(frame.to_string())).await?;
                            debug!("Sent handshake frame");
                        }
                        None => {
                            handshake_done = true;
                            info!("Feed handshake sent ({} frames)", config.handshake.len());
                        }
                    }
                }

                _ = ping_tick.tick() => {
                    write.send(Message::Ping(Vec::new())).await?;
                    debug!("Sent feed keepalive ping");
                }
            }
        }
    }

    /// Decode a text frame and advance the tracker. Malformed frames are
    /// counted and dropped.
    pub fn handle_text(
        text: &str,
        tracker: &mut RoundTracker,
        metrics: &Metrics,
    ) -> Option<CompletedRound> {
        metrics.inc_frames_received();

        match decode_frame(text) {
            Ok(frame) => {
                if let FeedFrame::RoundAnnounced(id) = &frame {
                    debug!("Round {} announced", id);
                }
                tracker.apply(frame)
            }
            Err(e) => {
                metrics.inc_frames_discarded();
                debug!("Discarding feed frame: {}", e);
                None
            }
        }
    }
}
