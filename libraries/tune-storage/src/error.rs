/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// No platform data directory could be determined
    #[error("No data directory available on this platform")]
    NoDataDir,

    /// Namespace contains characters that cannot form a file name
    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Stored document is not valid JSON
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for tune_core::TuneError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => tune_core::TuneError::Io(e),
            other => tune_core::TuneError::storage(other.to_string()),
        }
    }
}
