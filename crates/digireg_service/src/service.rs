//! The registry service.

use crate::caller::Caller;
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::format::{DescriptorTransformer, MarcTransformer, RecordFormat};
use crate::validation::Violations;
use chrono::NaiveDate;
use digireg_core::{
    DigitizationState, IdentifierSet, Record, RecordFilter, RecordLocator, Registry, StateChange,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

const IDENTIFIER_LIST: &str = "urnNbnList";

/// Validated entry point to the digitization registry.
///
/// Every operation checks its parameters before touching the database and
/// reports all problems at once. Write operations additionally require the
/// caller to hold the configured write role; that check runs first.
///
/// Data source and conversion failures are logged here and reported as
/// [`ServiceError::Internal`].
pub struct RegistryService {
    registry: Registry,
    transformer: Arc<dyn DescriptorTransformer>,
    config: ServiceConfig,
}

impl fmt::Debug for RegistryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryService")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn internal<E: fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> ServiceError {
    move |err| {
        error!(operation, error = %err, "registry operation failed");
        ServiceError::Internal
    }
}

impl RegistryService {
    /// Creates a service with a transformer that only serves MARC-XML.
    pub fn new(registry: Registry, config: ServiceConfig) -> Self {
        Self {
            registry,
            transformer: Arc::new(MarcTransformer::new()),
            config,
        }
    }

    /// Replaces the descriptor transformer.
    #[must_use]
    pub fn with_transformer(mut self, transformer: Arc<dyn DescriptorTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Returns the underlying registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Prepares the database for serving. Must succeed before any other
    /// operation is exposed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the sequence counter cannot be
    /// initialized.
    pub fn start(&self) -> ServiceResult<()> {
        let created = self.registry.bootstrap().map_err(internal("start"))?;
        info!(created, "registry service started");
        Ok(())
    }

    fn check_write_permission(&self, caller: &Caller) -> ServiceResult<()> {
        if caller.has_role(&self.config.write_role) {
            Ok(())
        } else {
            info!(caller = caller.name().unwrap_or("<anonymous>"), "write access denied");
            Err(ServiceError::Forbidden)
        }
    }

    /// Finds records and returns their descriptors in `format`.
    ///
    /// `format` defaults to MARC-XML. `max_results` is honored when it is
    /// positive and below the configured limit.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] if the query is missing or
    /// names no searchable field, and [`ServiceError::Internal`] if the
    /// search or a conversion fails.
    pub fn find_records(
        &self,
        query: Option<&RecordFilter>,
        format: Option<RecordFormat>,
        max_results: Option<i64>,
    ) -> ServiceResult<Vec<Record>> {
        let filter = match query {
            Some(filter) if has_searchable_field(filter) => filter,
            Some(_) => {
                return Err(ServiceError::InvalidRequest(
                    "Invalid query. Any non-empty parameter required.".into(),
                ))
            }
            None => return Err(ServiceError::InvalidRequest("Missing 'query' parameter.".into())),
        };

        let format = format.unwrap_or_default();
        let limit = self.config.effective_limit(max_results);
        let records = self
            .registry
            .find_records(filter.clone(), limit)
            .map_err(internal("find_records"))?;
        debug!(found = records.len(), limit, %format, "records found");

        records
            .into_iter()
            .map(|mut record| {
                record.descriptor = record
                    .descriptor
                    .map(|document| self.transformer.transform(document, format))
                    .transpose()
                    .map_err(internal("find_records"))?;
                Ok(record)
            })
            .collect()
    }

    /// Returns the state of a record, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] for a negative id and
    /// [`ServiceError::Internal`] if the lookup fails.
    pub fn record_state(&self, record_id: i64) -> ServiceResult<Option<DigitizationState>> {
        let mut violations = Violations::new();
        violations.record_id(record_id);
        violations.finish()?;

        self.registry
            .record_state(RecordLocator::id(record_id))
            .map_err(internal("record_state"))
    }

    /// Moves a record from `old_state` to `new_state`.
    ///
    /// A missing `old_state` means the record has no recognized state. `user`
    /// is required when finishing. Returns false if the record does not exist
    /// or its state has changed since the caller read it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] without the write role,
    /// [`ServiceError::InvalidRequest`] for bad parameters and
    /// [`ServiceError::Internal`] if the update fails.
    pub fn set_record_state(
        &self,
        caller: &Caller,
        record_id: i64,
        new_state: Option<DigitizationState>,
        old_state: Option<DigitizationState>,
        user: Option<&str>,
        date: Option<NaiveDate>,
    ) -> ServiceResult<bool> {
        self.check_write_permission(caller)?;
        let mut violations = Violations::new();
        violations.record_id(record_id);
        let new_state = violations.new_state(new_state);
        if new_state == DigitizationState::Finished {
            violations.non_empty("user", user);
        }
        violations.finish()?;

        let mut change = StateChange::new(new_state, old_state.unwrap_or(DigitizationState::Undefined));
        if let Some(user) = user {
            change = change.operator(user);
        }
        if let Some(date) = date {
            change = change.date(date);
        }
        self.registry
            .update_record_state(RecordLocator::id(record_id), change)
            .map_err(internal("set_record_state"))
    }

    /// Adds identifiers the record does not have yet.
    ///
    /// Entries are trimmed; blanks and repeats are dropped. `date` defaults
    /// to today. Returns false if the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] without the write role,
    /// [`ServiceError::InvalidRequest`] if the list is missing, empty, too
    /// long or holds only blanks, and [`ServiceError::Internal`] if the
    /// allocation fails.
    pub fn add_identifiers(
        &self,
        caller: &Caller,
        record_id: i64,
        date: Option<NaiveDate>,
        identifiers: Option<&[String]>,
    ) -> ServiceResult<bool> {
        let identifiers = self.identifier_request(caller, record_id, identifiers, 1)?;
        if identifiers.is_empty() {
            return Err(ServiceError::InvalidRequest(format!(
                "'{IDENTIFIER_LIST}' parameter contains no valid item!"
            )));
        }
        self.registry
            .add_identifiers(RecordLocator::id(record_id), date, identifiers)
            .map_err(internal("add_identifiers"))
    }

    /// Replaces all identifiers of a record. An empty list removes them.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] without the write role,
    /// [`ServiceError::InvalidRequest`] if the list is missing or too long,
    /// and [`ServiceError::Internal`] if the allocation fails.
    pub fn set_identifiers(
        &self,
        caller: &Caller,
        record_id: i64,
        date: Option<NaiveDate>,
        identifiers: Option<&[String]>,
    ) -> ServiceResult<bool> {
        let identifiers = self.identifier_request(caller, record_id, identifiers, 0)?;
        self.registry
            .set_identifiers(RecordLocator::id(record_id), date, identifiers)
            .map_err(internal("set_identifiers"))
    }

    fn identifier_request(
        &self,
        caller: &Caller,
        record_id: i64,
        identifiers: Option<&[String]>,
        min: usize,
    ) -> ServiceResult<IdentifierSet> {
        self.check_write_permission(caller)?;
        let mut violations = Violations::new();
        violations.record_id(record_id);
        match identifiers {
            None => violations.push(format!("Missing '{IDENTIFIER_LIST}' parameter.")),
            Some(list) => {
                violations.list_size(IDENTIFIER_LIST, list.len(), min, self.config.max_identifiers);
            }
        }
        violations.finish()?;
        Ok(identifiers.unwrap_or_default().iter().collect())
    }
}

fn has_searchable_field(filter: &RecordFilter) -> bool {
    [
        &filter.barcode,
        &filter.ccnb,
        &filter.isbn,
        &filter.issn,
        &filter.title,
        &filter.signature,
        &filter.field001,
    ]
    .into_iter()
    .any(|value| value.as_deref().is_some_and(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{StylesheetEngine, TransformError};
    use digireg_core::{DataSourceConfig, Descriptor};
    use digireg_testkit::{FlakySource, TestRegistry};
    use digireg_storage::MemorySource;

    fn writer() -> Caller {
        Caller::new("scanner").with_role("registry-ws")
    }

    fn service() -> (TestRegistry, RegistryService) {
        let fixture = TestRegistry::new();
        let service = RegistryService::new(fixture.registry.clone(), ServiceConfig::default());
        (fixture, service)
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn write_permission_checked_first() {
        let (_fixture, service) = service();
        let reader = Caller::new("reader");
        let err = service
            .set_record_state(&reader, -1, None, None, None, None)
            .unwrap_err();
        assert_eq!(err, ServiceError::Forbidden);
        let err = service
            .add_identifiers(&Caller::anonymous(), 1, None, None)
            .unwrap_err();
        assert_eq!(err, ServiceError::Forbidden);
    }

    #[test]
    fn custom_write_role() {
        let fixture = TestRegistry::new();
        fixture.insert_record(1, "cnb1", "bc1", None);
        let service = RegistryService::new(
            fixture.registry.clone(),
            ServiceConfig::new().with_write_role("editor"),
        );
        assert_eq!(
            service
                .set_identifiers(&writer(), 1, None, Some(&[][..]))
                .unwrap_err(),
            ServiceError::Forbidden
        );
        let editor = Caller::new("ed").with_role("editor");
        assert!(service.set_identifiers(&editor, 1, None, Some(&[][..])).unwrap());
    }

    #[test]
    fn set_state_accumulates_violations() {
        let (_fixture, service) = service();
        let err = service
            .set_record_state(&writer(), -5, Some(DigitizationState::Undefined), None, None, None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal 'recordId' parameter value '-5'.\nIllegal 'state' parameter value 'UNDEFINED'."
        );

        let err = service
            .set_record_state(&writer(), 1, Some(DigitizationState::Finished), None, Some(""), None)
            .unwrap_err();
        assert_eq!(err.to_string(), "'user' parameter is empty.");

        let err = service
            .set_record_state(&writer(), 1, None, None, None, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing 'state' parameter.");
    }

    #[test]
    fn set_state_updates_record() {
        let (fixture, service) = service();
        fixture.insert_record(42, "cnb42", "bc42", Some("planovane"));
        let date = NaiveDate::from_ymd_opt(2011, 3, 14).unwrap();

        let updated = service
            .set_record_state(
                &writer(),
                42,
                Some(DigitizationState::Finished),
                Some(DigitizationState::Scheduled),
                Some("jan"),
                Some(date),
            )
            .unwrap();
        assert!(updated);
        assert_eq!(service.record_state(42).unwrap(), Some(DigitizationState::Finished));
        let stored = fixture.stored_state(42);
        assert_eq!(stored.finisher.as_deref(), Some("jan"));
        assert_eq!(stored.finished.as_deref(), Some("2011-03-14"));

        let stale = service
            .set_record_state(
                &writer(),
                42,
                Some(DigitizationState::InProgress),
                Some(DigitizationState::Scheduled),
                None,
                None,
            )
            .unwrap();
        assert!(!stale);
    }

    #[test]
    fn record_state_rejects_negative_id() {
        let (_fixture, service) = service();
        let err = service.record_state(-1).unwrap_err();
        assert_eq!(err.to_string(), "Illegal 'recordId' parameter value '-1'.");
        assert_eq!(service.record_state(99).unwrap(), None);
    }

    #[test]
    fn find_requires_searchable_field() {
        let (_fixture, service) = service();
        let err = service.find_records(None, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'query' parameter.");

        let only_volume = RecordFilter::new().volume("3").barcode("");
        let err = service.find_records(Some(&only_volume), None, None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid query. Any non-empty parameter required.");
    }

    #[test]
    fn find_honors_max_results() {
        let (fixture, service) = service();
        for id in 1..=5 {
            fixture.insert_record(id, "cnb-shared", &format!("bc{id}"), None);
        }
        let filter = RecordFilter::new().ccnb("cnb-shared");
        assert_eq!(service.find_records(Some(&filter), None, Some(2)).unwrap().len(), 2);
        assert_eq!(service.find_records(Some(&filter), None, Some(0)).unwrap().len(), 5);
        assert_eq!(service.find_records(Some(&filter), None, None).unwrap().len(), 5);
    }

    #[test]
    fn find_converts_descriptors() {
        let (fixture, service) = service();
        fixture.insert_record(1, "cnb1", "bc1", None);
        fixture.insert_record(2, "cnb1", "bc2", None);
        fixture.set_descriptor(1, "<collection><record/></collection>");

        let transformer = MarcTransformer::new();
        let engine: Arc<dyn StylesheetEngine> =
            Arc::new(|doc: &str| -> Result<String, String> { Ok(format!("<mods>{}</mods>", doc.len())) });
        transformer.register(RecordFormat::Mods34, engine);
        let service = service.with_transformer(Arc::new(transformer));

        let filter = RecordFilter::new().ccnb("cnb1");
        let records = service
            .find_records(Some(&filter), Some(RecordFormat::Mods34), None)
            .unwrap();
        assert_eq!(records.len(), 2);
        let converted: Vec<_> = records
            .iter()
            .filter_map(|record| record.descriptor.as_ref())
            .collect();
        assert_eq!(converted.len(), 1);
        assert!(converted[0].as_str().starts_with("<mods>"));

        let marc = service.find_records(Some(&filter), None, None).unwrap();
        let descriptor = marc
            .iter()
            .find_map(|record| record.descriptor.as_ref())
            .unwrap();
        assert!(descriptor.as_str().contains("http://www.loc.gov/MARC21/slim"));
    }

    #[test]
    fn failed_conversion_is_internal() {
        struct Refusing;
        impl DescriptorTransformer for Refusing {
            fn transform(&self, _: Descriptor, format: RecordFormat) -> Result<Descriptor, TransformError> {
                Err(TransformError::Unsupported(format))
            }
        }

        let (fixture, service) = service();
        fixture.insert_record(1, "cnb1", "bc1", None);
        fixture.set_descriptor(1, "<collection/>");
        let service = service.with_transformer(Arc::new(Refusing));
        let filter = RecordFilter::new().barcode("bc1");
        let err = service
            .find_records(Some(&filter), Some(RecordFormat::DcRdf), None)
            .unwrap_err();
        assert_eq!(err, ServiceError::Internal);
    }

    #[test]
    fn add_identifiers_validation() {
        let (_fixture, service) = service();
        let err = service.add_identifiers(&writer(), 1, None, None).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'urnNbnList' parameter.");

        let err = service
            .add_identifiers(&writer(), -1, None, Some(&[][..]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal 'recordId' parameter value '-1'.\n'urnNbnList' parameter requires at least 1 item(s)."
        );

        let err = service
            .add_identifiers(&writer(), 1, None, Some(list(&["", "  "]).as_slice()))
            .unwrap_err();
        assert_eq!(err.to_string(), "'urnNbnList' parameter contains no valid item!");
    }

    #[test]
    fn identifier_list_limit() {
        let fixture = TestRegistry::new();
        let service = RegistryService::new(
            fixture.registry.clone(),
            ServiceConfig::new().with_max_identifiers(2),
        );
        let err = service
            .set_identifiers(&writer(), 1, None, Some(list(&["a", "b", "c"]).as_slice()))
            .unwrap_err();
        assert_eq!(err.to_string(), "'urnNbnList' parameter accepts no more than 2 item(s).");
    }

    #[test]
    fn add_and_set_identifiers() {
        let (fixture, service) = service();
        fixture.insert_record(7, "cnb7", "bc7", None);

        assert!(service
            .add_identifiers(&writer(), 7, None, Some(list(&[" urn:a ", "urn:b", "urn:a"]).as_slice()))
            .unwrap());
        let urns: Vec<_> = fixture.identifier_rows(7).into_iter().map(|row| row.urn).collect();
        assert_eq!(urns, vec!["urn:a", "urn:b"]);

        assert!(service.set_identifiers(&writer(), 7, None, Some(&[][..])).unwrap());
        assert!(fixture.identifier_rows(7).is_empty());

        assert!(!service
            .add_identifiers(&writer(), 8, None, Some(list(&["urn:c"]).as_slice()))
            .unwrap());
    }

    #[test]
    fn start_initializes_sequence() {
        let fixture = TestRegistry::unseeded(DataSourceConfig::default());
        let service = RegistryService::new(fixture.registry.clone(), ServiceConfig::default());
        service.start().unwrap();
        assert_eq!(fixture.counter(), Some(0));
        service.start().unwrap();
    }

    #[test]
    fn data_source_failure_is_internal() {
        let source = FlakySource::broken(MemorySource::new().unwrap()).shared();
        let registry = Registry::new(source, DataSourceConfig::default().connect_attempts(2));
        let service = RegistryService::new(registry, ServiceConfig::default());
        assert_eq!(service.start().unwrap_err(), ServiceError::Internal);
        assert_eq!(service.record_state(1).unwrap_err(), ServiceError::Internal);
    }
}
