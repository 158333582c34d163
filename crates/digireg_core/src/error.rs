//! Error types for the registry data access layer.

use thiserror::Error;

/// Result type for work done inside a unit of work.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type returned by the executor and the registry facade.
pub type DataSourceResult<T> = Result<T, DataSourceError>;

/// Causes of a failed unit of work.
///
/// Not-found records and stale states are not errors; they surface as
/// `false` or `None` results. Everything listed here aborts the transaction.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No connection could be acquired.
    #[error("storage error: {0}")]
    Storage(#[from] digireg_storage::StorageError),

    /// The database rejected a statement.
    #[error("sql error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A batch element reported no affected rows.
    #[error("batch item {index} failed: {affected} rows affected")]
    BatchItemFailed {
        /// Position of the element in the batch.
        index: usize,
        /// Rows reported by the element.
        affected: usize,
    },

    /// The named sequence counter row does not exist.
    #[error("sequence counter {name} is not initialized")]
    SequenceMissing {
        /// Counter name.
        name: String,
    },

    /// Advancing the sequence counter did not update exactly one row.
    #[error("sequence counter {name} update to {value} affected {affected} rows")]
    SequenceUpdateFailed {
        /// Counter name.
        name: String,
        /// Value that was being stored.
        value: i64,
        /// Rows reported by the update.
        affected: usize,
    },

    /// Creating the sequence counter row did not insert exactly one row.
    #[error("sequence counter {name} initialization affected {affected} rows")]
    SequenceInitFailed {
        /// Counter name.
        name: String,
        /// Rows reported by the insert.
        affected: usize,
    },

    /// A record address matched more than one row.
    #[error("record {locator} is ambiguous: {matched} rows matched")]
    AmbiguousRecord {
        /// Display form of the record address.
        locator: String,
        /// Number of matching rows.
        matched: usize,
    },

    /// The executor handed a query a result it did not declare.
    #[error("unexpected query result: expected {expected}, got {actual}")]
    UnexpectedOutcome {
        /// Declared result shape.
        expected: &'static str,
        /// Delivered result shape.
        actual: &'static str,
    },
}

impl CoreError {
    /// Creates a sequence missing error.
    pub fn sequence_missing(name: impl Into<String>) -> Self {
        Self::SequenceMissing { name: name.into() }
    }

    /// Returns true if the error comes from connection acquisition.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CoreError::Storage(_))
    }

    /// Returns true if the error is a broken data invariant rather than an
    /// I/O failure.
    pub fn is_consistency_violation(&self) -> bool {
        matches!(
            self,
            CoreError::BatchItemFailed { .. }
                | CoreError::SequenceMissing { .. }
                | CoreError::SequenceUpdateFailed { .. }
                | CoreError::SequenceInitFailed { .. }
                | CoreError::AmbiguousRecord { .. }
        )
    }
}

/// A unit of work failed and was rolled back.
///
/// Carries the original cause. Callers at the service boundary log the cause
/// and report a generic internal error.
#[derive(Debug, Error)]
#[error("data source failure: {source}")]
pub struct DataSourceError {
    #[source]
    source: CoreError,
}

impl DataSourceError {
    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &CoreError {
        &self.source
    }

    /// Consumes the error, returning the underlying cause.
    #[must_use]
    pub fn into_cause(self) -> CoreError {
        self.source
    }
}

impl From<CoreError> for DataSourceError {
    fn from(source: CoreError) -> Self {
        Self { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(CoreError::sequence_missing("x").is_consistency_violation());
        assert!(CoreError::BatchItemFailed {
            index: 2,
            affected: 0
        }
        .is_consistency_violation());
        let storage = CoreError::from(digireg_storage::StorageError::Unavailable("down".into()));
        assert!(storage.is_connectivity());
        assert!(!storage.is_consistency_violation());
    }

    #[test]
    fn wrapper_keeps_cause() {
        let err = DataSourceError::from(CoreError::SequenceUpdateFailed {
            name: "seq".into(),
            value: 9,
            affected: 0,
        });
        assert!(err.to_string().contains("seq"));
        assert!(matches!(
            err.cause(),
            CoreError::SequenceUpdateFailed { value: 9, .. }
        ));
        assert!(std::error::Error::source(&err).is_some());
    }
}
