use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be read or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the backend was doing.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Identifier cannot be used as a storage key.
    #[error("invalid storage key `{key}`")]
    InvalidKey {
        /// Rejected identifier.
        key: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Outcome of reading a single document.
///
/// Backends never fail on undecodable content: they report it as
/// [`Loaded::Corrupt`] and let the caller decide how to recover.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    /// Document exists and decoded cleanly.
    Found(T),
    /// No document stored under this key.
    Missing,
    /// Document exists but could not be decoded.
    Corrupt {
        /// Decoder message.
        reason: String,
    },
}
