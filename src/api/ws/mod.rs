//! Live status push over WebSocket

pub mod handler;

pub use handler::ws_handler;
