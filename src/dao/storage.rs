use std::error::Error;
use thiserror::Error;

/// Result alias for collaborator operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by content collaborators regardless of the underlying backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be reached or failed.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What the collaborator was doing.
        message: String,
        /// Backend failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
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
