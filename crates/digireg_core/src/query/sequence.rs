//! Named sequence counters.

use super::{unexpected, BoundStatement, PreparedQuery, QueryOutcome, ResultShape};
use crate::error::{CoreError, CoreResult};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

// A no-op update takes the row's write lock and returns the value in one
// step; SQLite has no SELECT ... FOR UPDATE.
const LOCK_SQL: &str = "UPDATE plaant_ids SET id = id WHERE deskname = ?1 RETURNING id";
const STORE_SQL: &str = "UPDATE plaant_ids SET id = ?1 WHERE deskname = ?2";
const INSERT_SQL: &str = "INSERT INTO plaant_ids (id, deskname) VALUES (0, ?)";
const READ_SQL: &str = "SELECT id FROM plaant_ids WHERE deskname = ?";

/// Hands out keys from a counter row locked for the current transaction.
///
/// The counter row stays locked until the transaction ends, so concurrent
/// allocations are serialized. Values handed out by [`next`](Self::next)
/// are only reserved once [`persist`](Self::persist) stores the final value
/// and the transaction commits.
#[derive(Debug)]
pub struct SequenceAllocator<'tx> {
    conn: &'tx Connection,
    name: String,
    locked: i64,
    value: i64,
}

impl<'tx> SequenceAllocator<'tx> {
    /// Locks the named counter row and reads its value.
    ///
    /// Returns `None` if the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the locking read fails.
    pub fn lock(tx: &'tx Transaction<'_>, name: &str) -> CoreResult<Option<Self>> {
        let conn: &'tx Connection = tx;
        debug!(sql = LOCK_SQL, name, "locking sequence counter");
        let current: Option<i64> = conn
            .query_row(LOCK_SQL, [name], |row| row.get(0))
            .optional()?;
        Ok(current.map(|value| Self {
            conn,
            name: name.to_string(),
            locked: value,
            value,
        }))
    }

    /// Counter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last value handed out, or the locked value if none was.
    #[must_use]
    pub fn current(&self) -> i64 {
        self.value
    }

    /// Returns the next key.
    pub fn next(&mut self) -> i64 {
        self.value += 1;
        self.value
    }

    /// Stores the last handed out value in the counter row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SequenceUpdateFailed`] unless exactly one row is
    /// updated.
    pub fn persist(self) -> CoreResult<i64> {
        if self.value == self.locked {
            return Ok(self.value);
        }
        debug!(sql = STORE_SQL, name = %self.name, value = self.value, "advancing sequence counter");
        let affected = self
            .conn
            .execute(STORE_SQL, rusqlite::params![self.value, self.name])?;
        if affected != 1 {
            return Err(CoreError::SequenceUpdateFailed {
                name: self.name,
                value: self.value,
                affected,
            });
        }
        Ok(self.value)
    }
}

/// Creates a counter row initialized to zero unless it already exists.
///
/// Output is true if the row was created by this call.
#[derive(Debug)]
pub struct BootstrapSequenceQuery {
    name: String,
    created: bool,
}

impl BootstrapSequenceQuery {
    /// Creates a bootstrap query for the named counter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: false,
        }
    }
}

impl PreparedQuery for BootstrapSequenceQuery {
    type Output = bool;

    fn shape(&self) -> ResultShape {
        ResultShape::Count
    }

    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>> {
        if let Some(existing) = SequenceAllocator::lock(tx, &self.name)? {
            debug!(name = %self.name, value = existing.current(), "sequence counter present");
            return Ok(None);
        }
        BoundStatement::new(tx, INSERT_SQL, vec![Value::Text(self.name.clone())]).map(Some)
    }

    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
        match outcome {
            QueryOutcome::Count(1) => {
                info!(name = %self.name, "sequence counter initialized");
                self.created = true;
                Ok(())
            }
            QueryOutcome::Count(affected) => Err(CoreError::SequenceInitFailed {
                name: self.name.clone(),
                affected,
            }),
            other => Err(unexpected(ResultShape::Count, &other)),
        }
    }

    fn finish(self) -> bool {
        self.created
    }
}

/// Reads the current value of a counter without locking it.
#[derive(Debug)]
pub struct ReadSequenceQuery {
    name: String,
    value: Option<i64>,
}

impl ReadSequenceQuery {
    /// Creates a read query for the named counter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

impl PreparedQuery for ReadSequenceQuery {
    type Output = Option<i64>;

    fn shape(&self) -> ResultShape {
        ResultShape::Rows
    }

    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>> {
        BoundStatement::new(tx, READ_SQL, vec![Value::Text(self.name.clone())]).map(Some)
    }

    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
        let rows = match outcome {
            QueryOutcome::Rows(rows) => rows,
            other => return Err(unexpected(ResultShape::Rows, &other)),
        };
        if let Some(row) = rows.next()? {
            self.value = Some(row.get(0)?);
        }
        Ok(())
    }

    fn finish(self) -> Option<i64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use rusqlite::TransactionBehavior;

    fn database() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::install(&conn).unwrap();
        conn
    }

    #[test]
    fn missing_counter_is_none() {
        let mut conn = database();
        let tx = conn.transaction().unwrap();
        assert!(SequenceAllocator::lock(&tx, "absent").unwrap().is_none());
    }

    #[test]
    fn allocation_is_monotonic() {
        let mut conn = database();
        conn.execute("INSERT INTO plaant_ids (id, deskname) VALUES (41, 'seq')", [])
            .unwrap();

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .unwrap();
        let mut allocator = SequenceAllocator::lock(&tx, "seq").unwrap().unwrap();
        assert_eq!(allocator.current(), 41);
        assert_eq!(allocator.next(), 42);
        assert_eq!(allocator.next(), 43);
        assert_eq!(allocator.persist().unwrap(), 43);
        tx.commit().unwrap();

        let stored: i64 = conn
            .query_row("SELECT id FROM plaant_ids WHERE deskname = 'seq'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, 43);
    }

    #[test]
    fn persist_without_allocation_writes_nothing() {
        let mut conn = database();
        conn.execute("INSERT INTO plaant_ids (id, deskname) VALUES (5, 'seq')", [])
            .unwrap();
        let tx = conn.transaction().unwrap();
        let allocator = SequenceAllocator::lock(&tx, "seq").unwrap().unwrap();
        assert_eq!(allocator.persist().unwrap(), 5);
    }
}
