//! Background services: feed client, frame decoding and metrics

pub mod feed_ws;
pub mod frames;
pub mod metrics;

pub use feed_ws::FeedClient;
pub use frames::{decode_frame, CompletedRound, DecodeError, FeedFrame, RoundTracker};
pub use metrics::{Metrics, MetricsSnapshot};
