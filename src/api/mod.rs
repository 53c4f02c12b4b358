//! Read-only web API for the dice predictor
//!
//! JSON and HTML views of the engine state plus a WebSocket status push.

pub mod routes;
pub mod server;
pub mod ws;

pub use server::{create_app, run_recorder, AppState, StatusSnapshot};
