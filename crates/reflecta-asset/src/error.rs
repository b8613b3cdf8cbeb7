//! Error types for reflecta-asset

use thiserror::Error;

/// Asset loading error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("Reflection error: {0}")]
    Reflection(#[from] reflecta_core::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Fails to compile if Error stops being Send + Sync.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
