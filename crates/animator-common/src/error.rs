//! Error types for Animator.

use thiserror::Error;

/// Top-level error type for operations that can fail outright.
///
/// Document editing itself never fails; these cover the edges around it
/// (parsing text, naming events and levels, configuration).
#[derive(Debug, Error)]
pub enum AnimatorError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Text was not valid JSON
    #[error("Invalid animation file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Document root was not a JSON object
    #[error("Invalid animation file: expected an object at the root, found {found}")]
    InvalidRoot {
        /// JSON type found instead
        found: &'static str,
    },

    /// Unknown document event name
    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    /// Unknown compression level name
    #[error("Unknown compression level: {0}")]
    UnknownCompression(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Animator operations.
pub type AnimatorResult<T> = Result<T, AnimatorError>;
