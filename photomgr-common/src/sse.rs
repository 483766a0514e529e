//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE helpers for photomgr services.

use axum::response::sse::{Event, KeepAlive};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Heartbeat interval for idle SSE connections
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Keep-alive policy shared by all event streams
pub fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")
}

/// Serialize `payload` into a named SSE event
///
/// Returns `None` (and logs) when the payload cannot be serialized, so a single
/// bad event never tears down the stream.
pub fn json_event<T: Serialize>(event_type: &str, payload: &T) -> Option<Event> {
    match serde_json::to_string(payload) {
        Ok(data) => Some(Event::default().event(event_type).data(data)),
        Err(e) => {
            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
            None
        }
    }
}

/// Initial event telling a freshly connected client the stream is live
pub fn connected_event() -> Event {
    Event::default().event("ConnectionStatus").data("connected")
}
