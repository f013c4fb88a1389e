//! HTTP API server for the mobile UI
//!
//! This module provides a REST API for controlling the voice session:
//! - POST /voice/start - Open the voice session
//! - POST /voice/stop - Stop the voice session
//! - GET /voice/status - Observable session state (flags, error, counters)
//! - GET /voice/transcript - Live transcript buffers
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
