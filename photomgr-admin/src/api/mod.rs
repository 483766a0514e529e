//! HTTP API handlers for photomgr-admin

pub mod health;
pub mod photos;
pub mod rebuild;
pub mod sse;

pub use health::health_routes;
pub use photos::photo_routes;
pub use rebuild::rebuild_routes;
pub use sse::rebuild_event_stream;
