//! Error types for the archie domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] unifies them at
//! the turn boundary.

use thiserror::Error;

/// The top-level error type for a conversation turn.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion / embedding endpoint errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Conversation log / state file errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures talking to the remote completion or embedding endpoint.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The endpoint answered with a non-success status.
    #[error("Remote endpoint returned {status_code}: {message}")]
    Remote { status_code: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The endpoint returned zero choices (or zero embeddings).
    #[error("Endpoint returned an empty response")]
    EmptyResponse,

    /// The connection dropped after at least one fragment arrived.
    #[error("Stream interrupted after {} bytes: {reason}", partial.len())]
    StreamInterrupted { partial: String, reason: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// The text received before a stream was interrupted, if any.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::StreamInterrupted { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether the failure still carries a usable partial answer.
    pub fn is_partial(&self) -> bool {
        self.partial_text().is_some_and(|p| !p.is_empty())
    }
}

/// Failures of the vector memory subsystem. Never fatal to a turn.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: store holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Failures reading or writing persisted JSON files.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to serialize {what}: {reason}")]
    Serialize { what: String, reason: String },
}

impl StorageError {
    /// Wrap an `io::Error` with the path it occurred on.
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}
