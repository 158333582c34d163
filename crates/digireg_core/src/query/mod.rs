//! Query objects.
//!
//! A query object encapsulates one unit of work: it prepares a single
//! statement (doing any auxiliary reads and writes it needs inside the same
//! transaction), and consumes the result the
//! [`QueryExecutor`](crate::QueryExecutor) delivers for it. Query objects are
//! single-use; the executor consumes them and hands back their output.
//!
//! ## Result Shapes
//!
//! Every query declares exactly one [`ResultShape`]:
//!
//! - `Rows` - the statement is a read, the query consumes a cursor
//! - `Count` - the statement is a write, the query consumes its affected rows
//! - `Batch` - the statement is executed once per parameter set, the query
//!   consumes one [`BatchItem`] per execution
//!
//! Write shapes run inside an immediate transaction so the write lock is
//! taken when the unit of work begins.

mod find_records;
mod identifiers;
mod record_state;
mod sequence;
mod update_state;

pub use find_records::FindRecordsQuery;
pub use identifiers::UpdateIdentifiersQuery;
pub use record_state::GetStateQuery;
pub use sequence::{BootstrapSequenceQuery, ReadSequenceQuery, SequenceAllocator};
pub use update_state::{StateChange, UpdateStateQuery};

pub(crate) use record_state::read_state;

use crate::error::CoreResult;
use rusqlite::types::Value;
use rusqlite::{Rows, Statement, Transaction, TransactionBehavior};
use tracing::debug;

/// How the executor runs a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// Read returning a cursor.
    Rows,
    /// Single write returning an affected row count.
    Count,
    /// Write executed once per parameter set.
    Batch,
}

impl ResultShape {
    /// Returns the shape name, used in errors and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ResultShape::Rows => "rows",
            ResultShape::Count => "count",
            ResultShape::Batch => "batch",
        }
    }

    pub(crate) const fn transaction_behavior(self) -> TransactionBehavior {
        match self {
            ResultShape::Rows => TransactionBehavior::Deferred,
            ResultShape::Count | ResultShape::Batch => TransactionBehavior::Immediate,
        }
    }
}

/// Result of one batch element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchItem {
    /// The element affected this many rows.
    Affected(usize),
    /// The element succeeded without reporting a row count.
    NoInfo,
}

impl BatchItem {
    /// Returns true if the element counts as a successful write.
    #[must_use]
    pub const fn succeeded(self) -> bool {
        match self {
            BatchItem::Affected(rows) => rows > 0,
            BatchItem::NoInfo => true,
        }
    }
}

/// Result delivered to [`PreparedQuery::consume`].
pub enum QueryOutcome<'a, 'stmt> {
    /// Cursor over the selected rows.
    Rows(&'a mut Rows<'stmt>),
    /// Rows affected by a write.
    Count(usize),
    /// Per-element results of a batch.
    Batch(Vec<BatchItem>),
}

impl QueryOutcome<'_, '_> {
    /// Returns the shape this outcome belongs to.
    #[must_use]
    pub fn shape(&self) -> ResultShape {
        match self {
            QueryOutcome::Rows(_) => ResultShape::Rows,
            QueryOutcome::Count(_) => ResultShape::Count,
            QueryOutcome::Batch(_) => ResultShape::Batch,
        }
    }
}

/// A statement with the parameters it is executed with.
pub struct BoundStatement<'tx> {
    sql: String,
    statement: Statement<'tx>,
    param_sets: Vec<Vec<Value>>,
}

impl<'tx> BoundStatement<'tx> {
    /// Prepares a statement executed once with `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite rejects the statement.
    pub fn new(tx: &'tx Transaction<'_>, sql: impl Into<String>, params: Vec<Value>) -> CoreResult<Self> {
        Self::batch(tx, sql, vec![params])
    }

    /// Prepares a statement executed once per parameter set.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite rejects the statement.
    pub fn batch(
        tx: &'tx Transaction<'_>,
        sql: impl Into<String>,
        param_sets: Vec<Vec<Value>>,
    ) -> CoreResult<Self> {
        let sql = sql.into();
        let statement = tx.prepare(&sql)?;
        Ok(Self {
            sql,
            statement,
            param_sets,
        })
    }

    /// SQL text of the statement.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of parameter sets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.param_sets.len()
    }

    /// Returns true if there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.param_sets.is_empty()
    }

    fn first_params(&self) -> &[Value] {
        self.param_sets.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Executes a read and hands the cursor to `consume`.
    pub(crate) fn query_with<F>(&mut self, consume: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Rows<'_>) -> CoreResult<()>,
    {
        let params = self.first_params().to_vec();
        debug!(sql = %self.sql, params = ?params, "executing query");
        let mut rows = self.statement.query(rusqlite::params_from_iter(params))?;
        consume(&mut rows)
    }

    /// Executes a single write.
    pub(crate) fn execute(&mut self) -> CoreResult<usize> {
        let params = self.first_params().to_vec();
        debug!(sql = %self.sql, params = ?params, "executing update");
        Ok(self.statement.execute(rusqlite::params_from_iter(params))?)
    }

    /// Executes the statement for every parameter set.
    pub(crate) fn execute_batch(&mut self) -> CoreResult<Vec<BatchItem>> {
        let mut items = Vec::with_capacity(self.param_sets.len());
        for params in &self.param_sets {
            debug!(sql = %self.sql, params = ?params, "executing batch element");
            let affected = self.statement.execute(rusqlite::params_from_iter(params.iter()))?;
            items.push(BatchItem::Affected(affected));
        }
        Ok(items)
    }
}

/// A single-use unit of work run by the executor.
///
/// The executor calls [`prepare`](Self::prepare) inside a fresh transaction.
/// Returning `Ok(None)` declines the work: the transaction is rolled back and
/// the executor returns [`finish`](Self::finish) without error. Otherwise the
/// statement is executed according to [`shape`](Self::shape), the result is
/// passed to [`consume`](Self::consume), and the transaction commits.
/// Any error rolls the whole transaction back.
pub trait PreparedQuery {
    /// Value produced when the unit of work ends.
    type Output;

    /// Declared result shape.
    fn shape(&self) -> ResultShape;

    /// Prepares the statement, or declines with `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Any error aborts the unit of work.
    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>>;

    /// Consumes the execution result.
    ///
    /// # Errors
    ///
    /// Any error aborts the unit of work.
    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()>;

    /// Returns the query's result.
    fn finish(self) -> Self::Output;
}

/// Builds the error for an outcome the query did not declare.
pub(crate) fn unexpected(expected: ResultShape, outcome: &QueryOutcome<'_, '_>) -> crate::CoreError {
    crate::CoreError::UnexpectedOutcome {
        expected: expected.as_str(),
        actual: outcome.shape().as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_item_success() {
        assert!(BatchItem::Affected(1).succeeded());
        assert!(BatchItem::NoInfo.succeeded());
        assert!(!BatchItem::Affected(0).succeeded());
    }

    #[test]
    fn write_shapes_lock_early() {
        assert!(matches!(
            ResultShape::Rows.transaction_behavior(),
            TransactionBehavior::Deferred
        ));
        assert!(matches!(
            ResultShape::Count.transaction_behavior(),
            TransactionBehavior::Immediate
        ));
        assert!(matches!(
            ResultShape::Batch.transaction_behavior(),
            TransactionBehavior::Immediate
        ));
    }
}
