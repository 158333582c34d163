//! Unit-of-work executor.

use crate::error::{CoreResult, DataSourceResult};
use crate::query::{PreparedQuery, QueryOutcome, ResultShape};
use digireg_storage::ConnectionSource;
use rusqlite::{Connection, Transaction};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Runs query objects, one transaction per query.
///
/// Every [`run`](Self::run) acquires its own connection, so an executor can
/// be shared between threads. Nothing is cached between runs.
#[derive(Clone)]
pub struct QueryExecutor {
    source: Arc<dyn ConnectionSource>,
    connect_attempts: u32,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("source", &self.source.describe())
            .field("connect_attempts", &self.connect_attempts)
            .finish()
    }
}

impl QueryExecutor {
    /// Creates an executor. `connect_attempts` below one is treated as one.
    pub fn new(source: Arc<dyn ConnectionSource>, connect_attempts: u32) -> Self {
        Self {
            source,
            connect_attempts: connect_attempts.max(1),
        }
    }

    /// Returns the connection source.
    pub fn source(&self) -> &Arc<dyn ConnectionSource> {
        &self.source
    }

    /// Runs a query in its own transaction and returns its output.
    ///
    /// A declined query rolls back and still returns its output. Any failure
    /// rolls back and is returned as a [`DataSourceError`](crate::DataSourceError).
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired, or if preparing,
    /// executing, consuming or committing fails.
    pub fn run<Q: PreparedQuery>(&self, mut query: Q) -> DataSourceResult<Q::Output> {
        let mut conn = self.connect()?;
        let outcome = Self::transact(&mut conn, &mut query);
        if let Err((_, err)) = conn.close() {
            error!(source = %self.source.describe(), error = %err, "failed to close connection");
        }
        outcome?;
        Ok(query.finish())
    }

    /// Acquires a connection, retrying retryable failures immediately.
    fn connect(&self) -> CoreResult<Connection> {
        let mut attempt = 1;
        loop {
            match self.source.connect() {
                Ok(conn) => return Ok(conn),
                Err(err) if err.is_retryable() && attempt < self.connect_attempts => {
                    warn!(
                        source = %self.source.describe(),
                        attempt,
                        attempts = self.connect_attempts,
                        error = %err,
                        "connection attempt failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn transact<Q: PreparedQuery>(conn: &mut Connection, query: &mut Q) -> CoreResult<()> {
        let shape = query.shape();
        let tx = conn.transaction_with_behavior(shape.transaction_behavior())?;
        match Self::execute(&tx, shape, query) {
            Ok(true) => {
                tx.commit()?;
                Ok(())
            }
            Ok(false) => {
                debug!("statement declined, rolling back");
                Self::rollback(tx);
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "unit of work failed, rolling back");
                Self::rollback(tx);
                Err(err)
            }
        }
    }

    /// Prepares, executes and consumes. Returns false if the query declined.
    fn execute<Q: PreparedQuery>(tx: &Transaction<'_>, shape: ResultShape, query: &mut Q) -> CoreResult<bool> {
        let Some(mut bound) = query.prepare(tx)? else {
            return Ok(false);
        };
        match shape {
            ResultShape::Rows => bound.query_with(|rows| query.consume(QueryOutcome::Rows(rows)))?,
            ResultShape::Count => {
                let affected = bound.execute()?;
                query.consume(QueryOutcome::Count(affected))?;
            }
            ResultShape::Batch => {
                let items = bound.execute_batch()?;
                query.consume(QueryOutcome::Batch(items))?;
            }
        }
        Ok(true)
    }

    fn rollback(tx: Transaction<'_>) {
        if let Err(err) = tx.rollback() {
            error!(error = %err, "rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::query::BoundStatement;
    use crate::testing::seeded_database;

    /// Inserts a counter row, then fails in the consume step.
    struct FailingInsert;

    impl PreparedQuery for FailingInsert {
        type Output = ();

        fn shape(&self) -> ResultShape {
            ResultShape::Count
        }

        fn prepare<'tx>(
            &mut self,
            tx: &'tx Transaction<'_>,
        ) -> CoreResult<Option<BoundStatement<'tx>>> {
            BoundStatement::new(
                tx,
                "INSERT INTO plaant_ids (id, deskname) VALUES (1, 'doomed')",
                Vec::new(),
            )
            .map(Some)
        }

        fn consume(&mut self, _outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
            Err(CoreError::BatchItemFailed {
                index: 0,
                affected: 0,
            })
        }

        fn finish(self) {}
    }

    fn counter_rows(executor: &QueryExecutor) -> i64 {
        let conn = executor.source.connect().unwrap();
        conn.query_row("SELECT COUNT(*) FROM plaant_ids WHERE deskname = 'doomed'", [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn failure_rolls_back() {
        let (_dir, source) = seeded_database();
        let executor = QueryExecutor::new(source, 1);

        let err = executor.run(FailingInsert).unwrap_err();
        assert!(matches!(err.cause(), CoreError::BatchItemFailed { .. }));
        assert_eq!(counter_rows(&executor), 0);
    }
}
