//! Error types for schema sensing.

use std::io;
use thiserror::Error;

/// Errors that can occur while building or rendering a schema store.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Failed to parse JSON payload
    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A decoded value fell outside the closed set of kinds
    #[error("unknown value kind at {path}: {detail}")]
    UnknownKind { path: String, detail: String },

    /// A node saw both objects and arrays at the same path
    #[error("structural contradiction at {path}: node is both object and array")]
    StructuralContradiction { path: String },

    /// An array with no enclosing field name
    #[error("bare top-level array at {path} cannot be rendered")]
    BareArray { path: String },

    /// Persisted store I/O failure
    #[error("i/o error while accessing schema store: {0}")]
    Io(#[from] io::Error),

    /// Persisted store is not in a readable format
    #[error("schema store format error: {0}")]
    Persist(String),
}

/// Result type for sensor operations.
pub type SensorResult<T> = Result<T, SensorError>;
