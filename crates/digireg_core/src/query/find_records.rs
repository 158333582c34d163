//! Record search.

use super::{unexpected, BoundStatement, PreparedQuery, QueryOutcome, ResultShape};
use crate::error::CoreResult;
use crate::record::{RawRecord, Record, RecordFilter};
use crate::state::StateVocabulary;
use rusqlite::types::Value;
use rusqlite::Transaction;
use tracing::warn;

/// Searches records matching every non-empty field of a filter.
///
/// Records come back in store order, at most `max_results` of them. An empty
/// filter is declined and yields no records.
#[derive(Debug)]
pub struct FindRecordsQuery {
    filter: RecordFilter,
    max_results: usize,
    vocabulary: &'static StateVocabulary,
    records: Vec<Record>,
}

impl FindRecordsQuery {
    /// Creates a search.
    pub fn new(filter: RecordFilter, max_results: usize, vocabulary: &'static StateVocabulary) -> Self {
        Self {
            filter,
            max_results,
            vocabulary,
            records: Vec::new(),
        }
    }
}

impl PreparedQuery for FindRecordsQuery {
    type Output = Vec<Record>;

    fn shape(&self) -> ResultShape {
        ResultShape::Rows
    }

    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>> {
        let conditions = self.filter.conditions();
        if conditions.is_empty() {
            warn!("record search without conditions declined");
            return Ok(None);
        }

        let clause = conditions
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let mut params: Vec<Value> = conditions
            .iter()
            .map(|(_, value)| Value::Text((*value).to_string()))
            .collect();
        params.push(Value::Integer(i64::try_from(self.max_results).unwrap_or(i64::MAX)));

        let sql = format!(
            "SELECT id, ccnb, carkod, stavrec, xml FROM predloha WHERE {clause} LIMIT ?"
        );
        BoundStatement::new(tx, sql, params).map(Some)
    }

    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
        let rows = match outcome {
            QueryOutcome::Rows(rows) => rows,
            other => return Err(unexpected(ResultShape::Rows, &other)),
        };
        while self.records.len() < self.max_results {
            let Some(row) = rows.next()? else {
                break;
            };
            let raw = RawRecord::from_row(row)?;
            self.records.push(raw.assemble(self.vocabulary));
        }
        Ok(())
    }

    fn finish(self) -> Vec<Record> {
        self.records
    }
}
