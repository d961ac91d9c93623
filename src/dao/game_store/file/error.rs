//! Error types shared by the JSON file storage implementation.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Convenient result alias returning [`FileDaoError`] failures.
pub type FileResult<T> = Result<T, FileDaoError>;

/// Failures that can occur while reading or writing documents on disk.
#[derive(Debug, Error)]
pub enum FileDaoError {
    /// A directory needed by the store could not be created.
    #[error("failed to create directory `{}`", path.display())]
    CreateDir {
        /// Path involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The data root exists but is not a directory.
    #[error("data root `{}` is not a directory", path.display())]
    NotADirectory {
        /// Configured root.
        path: PathBuf,
    },
    /// Reading a document or listing a directory failed.
    #[error("failed to read `{}`", path.display())]
    Read {
        /// Path involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Writing or renaming a document failed.
    #[error("failed to write `{}`", path.display())]
    Write {
        /// Path involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// Encoding a document to JSON failed.
    #[error("failed to encode `{}`", path.display())]
    Encode {
        /// Path involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// Identifier contains characters that cannot be used in a file name.
    #[error("invalid document key `{key}`")]
    InvalidKey {
        /// Rejected identifier.
        key: String,
    },
}
