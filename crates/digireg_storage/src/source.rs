//! Connection source trait definition.

use crate::error::StorageResult;
use rusqlite::Connection;

/// Hands out database connections for units of work.
///
/// Every call to [`connect`](ConnectionSource::connect) returns a new,
/// independent connection. The caller owns it for the duration of one
/// transaction and drops (closes) it afterwards.
///
/// # Invariants
///
/// - Returned connections are fully configured (pragmas applied)
/// - Connections from the same source see the same database
/// - Sources must be `Send + Sync` for concurrent callers
///
/// # Implementors
///
/// - [`super::SqliteSource`] - For persistent databases
/// - [`super::MemorySource`] - For testing
pub trait ConnectionSource: Send + Sync {
    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or configured.
    /// Use [`StorageError::is_retryable`](crate::StorageError::is_retryable)
    /// to decide whether another attempt makes sense.
    fn connect(&self) -> StorageResult<Connection>;

    /// Short human-readable description of the database, used in logs.
    fn describe(&self) -> String;
}

impl<S: ConnectionSource + ?Sized> ConnectionSource for std::sync::Arc<S> {
    fn connect(&self) -> StorageResult<Connection> {
        (**self).connect()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
