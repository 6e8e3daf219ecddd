//! Error types for the behavior tracker

use thiserror::Error;

/// Errors that can occur outside the infallible event path
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to parse event script: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input event: {0}")]
    InvalidEvent(String),

    #[error("Log store error: {0}")]
    StoreError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
