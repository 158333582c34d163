//! Registry facade.

use crate::config::DataSourceConfig;
use crate::error::DataSourceResult;
use crate::executor::QueryExecutor;
use crate::identifier::{AllocationMode, IdentifierSet};
use crate::locator::RecordLocator;
use crate::query::{
    BootstrapSequenceQuery, FindRecordsQuery, GetStateQuery, ReadSequenceQuery, StateChange,
    UpdateIdentifiersQuery, UpdateStateQuery,
};
use crate::record::{Record, RecordFilter};
use crate::state::{DigitizationState, StateVocabulary};
use chrono::NaiveDate;
use digireg_storage::ConnectionSource;
use std::sync::Arc;
use tracing::info;

/// Transactional access to the digitization registry.
///
/// Each operation builds a query object and runs it in its own transaction.
/// The registry holds no state between calls and can be shared between
/// threads.
///
/// # Example
///
/// ```rust
/// use digireg_core::{DataSourceConfig, Registry, schema};
/// use digireg_storage::{ConnectionSource, MemorySource};
/// use std::sync::Arc;
///
/// let source = Arc::new(MemorySource::new().unwrap());
/// schema::install(&source.connect().unwrap()).unwrap();
///
/// let registry = Registry::new(source, DataSourceConfig::default());
/// assert!(registry.bootstrap().unwrap());
/// assert_eq!(registry.sequence_value().unwrap(), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct Registry {
    executor: QueryExecutor,
    config: DataSourceConfig,
}

impl Registry {
    /// Creates a registry over a connection source.
    pub fn new(source: Arc<dyn ConnectionSource>, config: DataSourceConfig) -> Self {
        Self {
            executor: QueryExecutor::new(source, config.connect_attempts),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    /// Returns the executor, for running custom query objects.
    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn vocabulary(&self) -> &'static StateVocabulary {
        StateVocabulary::for_schema(self.config.schema)
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Finds at most `max_results` records matching every non-empty field
    /// of `filter`. An empty filter finds nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails.
    pub fn find_records(&self, filter: RecordFilter, max_results: usize) -> DataSourceResult<Vec<Record>> {
        self.executor
            .run(FindRecordsQuery::new(filter, max_results, self.vocabulary()))
    }

    /// Returns the state of a record, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails.
    pub fn record_state(&self, locator: impl Into<RecordLocator>) -> DataSourceResult<Option<DigitizationState>> {
        self.executor
            .run(GetStateQuery::new(locator.into(), self.vocabulary()))
    }

    /// Applies a state transition if the record is still in the state the
    /// caller observed.
    ///
    /// Returns false if the record does not exist or its state moved on.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails or the locator matches more
    /// than one record.
    pub fn update_record_state(
        &self,
        locator: impl Into<RecordLocator>,
        change: StateChange,
    ) -> DataSourceResult<bool> {
        self.executor.run(UpdateStateQuery::new(
            locator.into(),
            change,
            self.vocabulary(),
            self.config.system_operator.as_str(),
            Self::today(),
        ))
    }

    /// Replaces the identifiers of a record.
    ///
    /// `date` defaults to today. Returns false if the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails, for example when the
    /// identifier sequence is not initialized.
    pub fn set_identifiers(
        &self,
        locator: impl Into<RecordLocator>,
        date: Option<NaiveDate>,
        identifiers: IdentifierSet,
    ) -> DataSourceResult<bool> {
        self.allocate(locator.into(), date, identifiers, AllocationMode::Set)
    }

    /// Adds identifiers the record does not have yet.
    ///
    /// `date` defaults to today. Returns false if the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails, for example when the
    /// identifier sequence is not initialized.
    pub fn add_identifiers(
        &self,
        locator: impl Into<RecordLocator>,
        date: Option<NaiveDate>,
        identifiers: IdentifierSet,
    ) -> DataSourceResult<bool> {
        self.allocate(locator.into(), date, identifiers, AllocationMode::Add)
    }

    fn allocate(
        &self,
        locator: RecordLocator,
        date: Option<NaiveDate>,
        identifiers: IdentifierSet,
        mode: AllocationMode,
    ) -> DataSourceResult<bool> {
        self.executor.run(UpdateIdentifiersQuery::new(
            locator,
            identifiers,
            date.unwrap_or_else(Self::today),
            mode,
            self.config.identifier_sequence.as_str(),
        ))
    }

    /// Ensures the identifier sequence counter exists.
    ///
    /// Returns true if this call created it.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails.
    pub fn bootstrap(&self) -> DataSourceResult<bool> {
        let created = self
            .executor
            .run(BootstrapSequenceQuery::new(self.config.identifier_sequence.as_str()))?;
        info!(
            sequence = %self.config.identifier_sequence,
            created,
            "identifier sequence ready"
        );
        Ok(created)
    }

    /// Returns the current value of the identifier sequence counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit of work fails.
    pub fn sequence_value(&self) -> DataSourceResult<Option<i64>> {
        self.executor
            .run(ReadSequenceQuery::new(self.config.identifier_sequence.as_str()))
    }
}
