//! End-to-end service workflow over a temporary database.

use chrono::NaiveDate;
use digireg_core::{DataSourceConfig, DigitizationState, RecordFilter};
use digireg_service::{Caller, RecordFormat, RegistryService, ServiceConfig, ServiceError};
use digireg_testkit::TestRegistry;

fn scanner() -> Caller {
    Caller::new("scanner").with_role("registry-ws")
}

#[test]
fn digitization_lifecycle() {
    let fixture = TestRegistry::unseeded(DataSourceConfig::default());
    fixture.insert_record(42, "cnb001234567", "2610012345", Some("planovane"));
    fixture.set_descriptor(42, "<collection><record><leader/></record></collection>");

    let service = RegistryService::new(fixture.registry.clone(), ServiceConfig::default());
    service.start().unwrap();

    let filter = RecordFilter::new().barcode("2610012345");
    let found = service
        .find_records(Some(&filter), Some(RecordFormat::MarcXml), Some(10))
        .unwrap();
    assert_eq!(found.len(), 1);
    let json = serde_json::to_value(&found[0]).unwrap();
    assert_eq!(json["state"], "SCHEDULED");
    assert_eq!(json["id"], 42);

    let observed = service.record_state(42).unwrap();
    assert_eq!(observed, Some(DigitizationState::Scheduled));
    assert!(service
        .set_record_state(&scanner(), 42, Some(DigitizationState::InProgress), observed, None, None)
        .unwrap());

    let awarded = NaiveDate::from_ymd_opt(2012, 5, 2).unwrap();
    let urns = vec!["urn:nbn:cz:nk-0001".to_string(), "urn:nbn:cz:nk-0002".to_string()];
    assert!(service
        .add_identifiers(&scanner(), 42, Some(awarded), Some(urns.as_slice()))
        .unwrap());
    let rows = fixture.identifier_rows(42);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].awarded.as_deref(), Some("2012-05-02"));
    assert!(rows[0].relief);
    assert!(!rows[1].relief);

    assert!(service
        .set_record_state(
            &scanner(),
            42,
            Some(DigitizationState::Finished),
            Some(DigitizationState::InProgress),
            Some("jan.novak"),
            None,
        )
        .unwrap());
    assert_eq!(fixture.stored_state(42).state.as_deref(), Some("finished"));
    assert_eq!(fixture.counter(), Some(2));
}

#[test]
fn unsupported_format_is_internal_error() {
    let fixture = TestRegistry::new();
    fixture.insert_record(1, "cnb1", "bc1", None);
    fixture.set_descriptor(1, "<collection/>");
    let service = RegistryService::new(fixture.registry.clone(), ServiceConfig::default());

    let filter = RecordFilter::new().ccnb("cnb1");
    let err = service
        .find_records(Some(&filter), Some(RecordFormat::DcRdf), None)
        .unwrap_err();
    assert_eq!(err, ServiceError::Internal);
    assert!(err.is_server_error());
}
