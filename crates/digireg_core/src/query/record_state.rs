//! State lookups.

use super::{unexpected, BoundStatement, PreparedQuery, QueryOutcome, ResultShape};
use crate::error::CoreResult;
use crate::locator::RecordLocator;
use crate::state::{DigitizationState, StateVocabulary};
use rusqlite::{Connection, OptionalExtension, Transaction};
use tracing::debug;

fn select_sql(locator: &RecordLocator) -> String {
    format!("SELECT stavrec FROM predloha WHERE {}", locator.predicate())
}

/// Reads the live state of a record inside an open transaction.
///
/// Returns `None` if no record matches.
pub(crate) fn read_state(
    conn: &Connection,
    locator: &RecordLocator,
    vocabulary: &StateVocabulary,
) -> CoreResult<Option<DigitizationState>> {
    let sql = select_sql(locator);
    let params = locator.values();
    debug!(sql = %sql, params = ?params, "reading live state");
    let stored: Option<Option<String>> = conn
        .query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))
        .optional()?;
    Ok(stored.map(|text| vocabulary.resolve(text.as_deref())))
}

/// Looks up the digitization state of one record.
///
/// Output is `None` when no record matches the locator.
#[derive(Debug)]
pub struct GetStateQuery {
    locator: RecordLocator,
    vocabulary: &'static StateVocabulary,
    state: Option<DigitizationState>,
}

impl GetStateQuery {
    /// Creates a state lookup.
    pub fn new(locator: RecordLocator, vocabulary: &'static StateVocabulary) -> Self {
        Self {
            locator,
            vocabulary,
            state: None,
        }
    }
}

impl PreparedQuery for GetStateQuery {
    type Output = Option<DigitizationState>;

    fn shape(&self) -> ResultShape {
        ResultShape::Rows
    }

    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>> {
        BoundStatement::new(tx, select_sql(&self.locator), self.locator.values()).map(Some)
    }

    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
        let rows = match outcome {
            QueryOutcome::Rows(rows) => rows,
            other => return Err(unexpected(ResultShape::Rows, &other)),
        };
        if let Some(row) = rows.next()? {
            let stored: Option<String> = row.get(0)?;
            self.state = Some(self.vocabulary.resolve(stored.as_deref()));
        }
        Ok(())
    }

    fn finish(self) -> Option<DigitizationState> {
        self.state
    }
}
