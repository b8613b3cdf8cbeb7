//! Error types for reflecta-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Name absent from the class or array registry
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Accessor has no bundle behind it
    #[error("Invalid field accessor")]
    InvalidField,

    /// Pointer slot already holds an instance before a read
    #[error("Read target is already initialized")]
    AlreadyInitialized,

    /// Array element index past the end of the sequence
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Instance or value is not of the type the bundle expects
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    /// JSON document does not have the expected shape
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// Teardown requested while other registry handles are alive
    #[error("Registry still in use by {0} handle(s)")]
    RegistryInUse(usize),
}

impl Error {
    pub(crate) fn mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

// Fails to compile if Error stops being Send + Sync.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
