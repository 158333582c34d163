//! Optimistic state transitions.

use super::{read_state, unexpected, BoundStatement, PreparedQuery, QueryOutcome, ResultShape};
use crate::error::{CoreError, CoreResult};
use crate::locator::RecordLocator;
use crate::state::{DigitizationState, StateVocabulary};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Transaction;
use tracing::{debug, info, warn};

// Appended when the caller's view of the state is stale.
const NEVER: &str = " AND 0 = 1";

/// A requested state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// State to write.
    pub new_state: DigitizationState,
    /// State the caller last observed; `Undefined` for "no prior state".
    pub old_state: DigitizationState,
    /// Digitization operator, written when finishing.
    pub operator: Option<String>,
    /// Date of the digitization event, today if absent.
    pub date: Option<NaiveDate>,
}

impl StateChange {
    /// Creates a transition from `old_state` to `new_state`.
    #[must_use]
    pub fn new(new_state: DigitizationState, old_state: DigitizationState) -> Self {
        Self {
            new_state,
            old_state,
            operator: None,
            date: None,
        }
    }

    /// Sets the digitization operator.
    #[must_use]
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Sets the event date.
    #[must_use]
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Conditionally moves a record to a new state.
///
/// The update only applies while the persisted state still matches the
/// caller's `old_state`. Output is true iff exactly one row was updated; a
/// missing record and a stale `old_state` both yield false.
#[derive(Debug)]
pub struct UpdateStateQuery {
    locator: RecordLocator,
    change: StateChange,
    vocabulary: &'static StateVocabulary,
    system_operator: String,
    today: NaiveDate,
    updated: bool,
}

impl UpdateStateQuery {
    /// Creates an update query. `today` stamps the edit columns.
    pub fn new(
        locator: RecordLocator,
        change: StateChange,
        vocabulary: &'static StateVocabulary,
        system_operator: impl Into<String>,
        today: NaiveDate,
    ) -> Self {
        Self {
            locator,
            change,
            vocabulary,
            system_operator: system_operator.into(),
            today,
            updated: false,
        }
    }

    fn guard(&self, tx: &Transaction<'_>) -> CoreResult<(String, Vec<Value>)> {
        let old = self.change.old_state;
        match &self.locator {
            RecordLocator::Id(_) => {
                let live = read_state(tx, &self.locator, self.vocabulary)?
                    .unwrap_or(DigitizationState::Undefined);
                if live == old {
                    Ok((String::new(), Vec::new()))
                } else {
                    debug!(locator = %self.locator, %old, %live, "stale state, update will match nothing");
                    Ok((NEVER.to_string(), Vec::new()))
                }
            }
            RecordLocator::Composite { .. } => {
                let forms: Vec<Value> = self
                    .vocabulary
                    .encodings(old)
                    .map(|text| Value::Text(text.to_string()))
                    .collect();
                if forms.is_empty() {
                    return Ok((" AND stavrec IS NULL".to_string(), Vec::new()));
                }
                let placeholders = vec!["?"; forms.len()].join(", ");
                Ok((format!(" AND stavrec IN ({placeholders})"), forms))
            }
        }
    }
}

impl PreparedQuery for UpdateStateQuery {
    type Output = bool;

    fn shape(&self) -> ResultShape {
        ResultShape::Count
    }

    fn prepare<'tx>(&mut self, tx: &'tx Transaction<'_>) -> CoreResult<Option<BoundStatement<'tx>>> {
        let Some(stored) = self.vocabulary.encode(self.change.new_state) else {
            warn!(locator = %self.locator, "refusing to write undefined state");
            return Ok(None);
        };

        let edited = Value::Text(self.today.to_string());
        let editor = Value::Text(self.system_operator.clone());
        let (assignments, mut params) = if self.change.new_state == DigitizationState::Finished {
            let finished = self.change.date.unwrap_or(self.today);
            (
                "stavrec = ?, findate = ?, finuser = ?, edidate = ?, ediuser = ?",
                vec![
                    Value::Text(stored.to_string()),
                    Value::Text(finished.to_string()),
                    self.change
                        .operator
                        .clone()
                        .map_or(Value::Null, Value::Text),
                    edited,
                    editor,
                ],
            )
        } else {
            (
                "stavrec = ?, edidate = ?, ediuser = ?",
                vec![Value::Text(stored.to_string()), edited, editor],
            )
        };

        let (guard, guard_params) = self.guard(tx)?;
        params.extend(self.locator.values());
        params.extend(guard_params);
        let sql = format!(
            "UPDATE predloha SET {assignments} WHERE {}{guard}",
            self.locator.predicate()
        );
        BoundStatement::new(tx, sql, params).map(Some)
    }

    fn consume(&mut self, outcome: QueryOutcome<'_, '_>) -> CoreResult<()> {
        match outcome {
            QueryOutcome::Count(affected) if affected > 1 => Err(CoreError::AmbiguousRecord {
                locator: self.locator.to_string(),
                matched: affected,
            }),
            QueryOutcome::Count(affected) => {
                self.updated = affected == 1;
                info!(
                    locator = %self.locator,
                    state = %self.change.new_state,
                    updated = self.updated,
                    "state update"
                );
                Ok(())
            }
            other => Err(unexpected(ResultShape::Count, &other)),
        }
    }

    fn finish(self) -> bool {
        self.updated
    }
}
