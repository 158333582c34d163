//! URN:NBN allocation.

use super::{
    unexpected, BatchItem, BoundStatement, PreparedQuery, QueryOutcome, ResultShape,
    SequenceAllocator,
};
use crate::error::{CoreError, CoreResult};
use crate::identifier::{AllocationMode, IdentifierSet};
use crate::locator::RecordLocator;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction};
use tracing::{debug, warn};

const INSERT_SQL: &str = "INSERT INTO urnnbn \
     (id, rpredloha_urnnbn, urnnbn, awarddate, rpredloha_urnnbnmf) VALUES (?, ?, ?, ?, ?)";
const EXISTING_SQL: &str = "SELECT urnnbn FROM urnnbn WHERE rpredloha_urnnbn = ?";
const DELETE_SQL: &str = "DELETE FROM urnnbn WHERE rpredloha_urnnbn = ?";

/// Resolves the surrogate key of the addressed record.
fn record_key(conn: &Connection, locator: &RecordLocator) -> CoreResult<Option<i64>> {
    let sql = format!("SELECT id FROM predloha WHERE {}", locator.predicate());
    let params = locator.values();
    debug!(sql = %sql, params = ?params, "resolving record");
    let mut stmt = conn.prepare(&sql)?;
    let keys = stmt
        .query_map(rusqlite::params_from_iter(params), |row| row.get::<_, i64>(0))?
        .take(2)
        .collect::<rusqlite::Result<Vec<_>>>()?;
    match keys.as_slice() {
        [] => Ok(None),
        [key] => Ok(Some(*key)),
        _ => Err(CoreError::AmbiguousRecord {
            locator: locator.to_string(),
            matched: keys.len(),
        }),
    }
}

/// Drops identifiers the record already has.
///
/// Returns true if the record had any identifiers at all.
fn exclude_existing(conn: &Connection, record: i64, identifiers: &mut IdentifierSet) -> CoreResult<bool> {
    debug!(sql = EXISTING_SQL, record, "reading existing identifiers");
    let mut stmt = conn.prepare(EXISTING_SQL)?;
    let existing = stmt
        .query_map([record], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    identifiers.retain_missing(|candidate| {
        let present = existing.iter().any(|item| item == candidate);
        if present {
            debug!(record, identifier = candidate, "identifier already allocated");
        }
        present
    });
    Ok(!existing.is_empty())
}

/// Inserts persistent identifiers for a record.
///
/// In [`AllocationMode::Set`] the record's identifiers are replaced; in
/// [`AllocationMode::Add`] only identifiers the record does not have yet are
/// inserted. Keys come from the identifier sequence counter, locked for the
/// whole transaction. The first inserted row carries the relief flag unless
/// the record already had identifiers in add mode.
///
/// Output is false if the record does not exist.
#[derive(Debug)]
pub struct UpdateIdentifiersQuery {
    locator: RecordLocator,
    identifiers: IdentifierSet,
    date: NaiveDate,
    mode: AllocationMode,
    sequence: String,
    updated: bool,
}

impl UpdateIdentifiersQuery {
    /// Creates an identifier update for the record at `locator`.
    pub fn new(
        locator: RecordLocator,
        identifiers: IdentifierSet,
        date: NaiveDate,
        mode: AllocationMode,
        sequence: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            identifiers,
            date,
            mode,
            sequence: sequence.into(),
            updated: false,
        }
    }
}

impl PreparedQuery for UpdateIdentifiersQuery {
    type Output = bool;

    fn shape(&self) -> ResultShape {
        ResultShape::Batch
    }

    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>> {
        let Some(record) = record_key(tx, &self.locator)? else {
            warn!(locator = %self.locator, mode = self.mode.as_str(), "record not found, identifiers unchanged");
            return Ok(None);
        };

        let mut allocator = SequenceAllocator::lock(tx, &self.sequence)?
            .ok_or_else(|| CoreError::sequence_missing(self.sequence.as_str()))?;

        let mut relief = match self.mode {
            AllocationMode::Add => !exclude_existing(tx, record, &mut self.identifiers)?,
            AllocationMode::Set => {
                debug!(sql = DELETE_SQL, record, "removing identifiers");
                tx.execute(DELETE_SQL, [record])?;
                true
            }
        };

        let date = Value::Text(self.date.to_string());
        let mut rows = Vec::with_capacity(self.identifiers.len());
        for identifier in self.identifiers.iter() {
            rows.push(vec![
                Value::Integer(allocator.next()),
                Value::Integer(record),
                Value::Text(identifier.to_string()),
                date.clone(),
                Value::Integer(i64::from(relief)),
            ]);
            relief = false;
        }
        allocator.persist()?;

        BoundStatement::batch(tx, INSERT_SQL, rows).map(Some)
    }

    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
        let items = match outcome {
            QueryOutcome::Batch(items) => items,
            other => return Err(unexpected(ResultShape::Batch, &other)),
        };
        if let Some((index, item)) = items.iter().enumerate().find(|(_, item)| !item.succeeded()) {
            let affected = match item {
                BatchItem::Affected(rows) => *rows,
                BatchItem::NoInfo => 0,
            };
            return Err(CoreError::BatchItemFailed { index, affected });
        }
        debug!(locator = %self.locator, inserted = items.len(), "identifiers stored");
        self.updated = true;
        Ok(())
    }

    fn finish(self) -> bool {
        self.updated
    }
}
