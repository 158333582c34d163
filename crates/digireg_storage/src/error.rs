//! Error types for connection acquisition.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while acquiring or preparing a connection.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The configured database location cannot be used.
    #[error("invalid database path: {0}")]
    InvalidPath(String),

    /// The source is temporarily unable to hand out connections.
    #[error("connection source unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Returns true if acquiring a connection again may succeed.
    ///
    /// Configuration mistakes never heal on their own; everything else
    /// (locked files, exhausted handles, driver hiccups) is worth another try.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StorageError::InvalidPath(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(StorageError::Unavailable("busy".into()).is_retryable());
        assert!(StorageError::Io(io::Error::new(io::ErrorKind::Other, "x")).is_retryable());
        assert!(!StorageError::InvalidPath("".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = StorageError::InvalidPath("/nowhere".into());
        assert_eq!(err.to_string(), "invalid database path: /nowhere");
    }
}
