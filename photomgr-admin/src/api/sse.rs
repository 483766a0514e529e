//! Server-Sent Events for live rebuild progress

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use photomgr_common::sse::{connected_event, json_event, keep_alive};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::AppState;

/// GET /api/rebuild/events
///
/// Streams RebuildStarted, RebuildLog, RebuildProgress and RebuildFinished.
/// A client that falls behind skips the missed events and should poll
/// `/api/rebuild/status` for the full log.
pub async fn rebuild_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to rebuild events");

    let mut rx = state.rebuild.subscribe();

    let stream = async_stream::stream! {
        yield Ok(connected_event());

        loop {
            match rx.recv().await {
                Ok(event) => {
                    debug!("SSE: Broadcasting rebuild event: {}", event.event_type());
                    if let Some(sse_event) = json_event(event.event_type(), &event) {
                        yield Ok(sse_event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: Client lagging, rebuild events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(keep_alive())
}
