//! Common error types for photomgr

use thiserror::Error;

/// Common result type for photomgr operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across photomgr services
#[derive(Error, Debug)]
pub enum Error {
    /// Local filesystem failure on the manifest or media files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// On-disk manifest is not a valid catalog
    #[error("Manifest parse error: {0}")]
    Parse(String),

    /// Targeted record (or other resource) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation rejected because a conflicting one is in flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object store or cache tier failure
    #[error("Remote tier error: {0}")]
    Remote(String),

    /// Unexpected failure inside a background worker
    #[error("Worker fault: {0}")]
    WorkerFault(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

