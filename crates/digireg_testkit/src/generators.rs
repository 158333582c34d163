//! Property-based test generators using proptest.

use digireg_core::{DigitizationState, SchemaVariant};
use proptest::prelude::*;

/// Strategy for well-formed URN:NBN identifiers.
pub fn urn_nbn_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("urn:nbn:cz:[a-z]{2,3}[0-9]{3}-[0-9a-z]{6}").expect("Invalid regex")
}

/// Strategy for raw identifier input: valid identifiers mixed with blanks,
/// padding and repeats.
pub fn raw_identifier_list_strategy() -> impl Strategy<Value = Vec<String>> {
    let entry = prop_oneof![
        4 => urn_nbn_strategy(),
        1 => urn_nbn_strategy().prop_map(|urn| format!("  {urn}\t")),
        1 => Just(String::new()),
        1 => Just("   ".to_string()),
    ];
    prop::collection::vec(entry, 0..20).prop_flat_map(|entries| {
        let len = entries.len();
        (Just(entries), prop::collection::vec(0..len.max(1), 0..3))
    })
    .prop_map(|(mut entries, repeats)| {
        for index in repeats {
            if let Some(entry) = entries.get(index).cloned() {
                entries.push(entry);
            }
        }
        entries
    })
}

/// Strategy for states that may be written.
pub fn writable_state_strategy() -> impl Strategy<Value = DigitizationState> {
    prop_oneof![
        Just(DigitizationState::Scheduled),
        Just(DigitizationState::InProgress),
        Just(DigitizationState::Finished),
    ]
}

/// Strategy for any state, including the `Undefined` sentinel.
pub fn state_strategy() -> impl Strategy<Value = DigitizationState> {
    prop::sample::select(DigitizationState::ALL.to_vec())
}

/// Strategy for table layout variants.
pub fn schema_strategy() -> impl Strategy<Value = SchemaVariant> {
    prop_oneof![Just(SchemaVariant::Surrogate), Just(SchemaVariant::Composite)]
}

/// Strategy for MARC-XML documents with or without the namespace
/// declaration on the root element.
pub fn marc_collection_strategy() -> impl Strategy<Value = String> {
    let prolog = prop_oneof![
        Just(String::new()),
        Just("<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_string()),
    ];
    let control = prop::string::string_regex("[0-9a-z]{1,12}").expect("Invalid regex");
    (prolog, control, any::<bool>()).prop_map(|(prolog, control, declared)| {
        let root = if declared {
            "<collection xmlns=\"http://www.loc.gov/MARC21/slim\">"
        } else {
            "<collection>"
        };
        format!(
            "{prolog}{root}<record><controlfield tag=\"001\">{control}</controlfield></record></collection>"
        )
    })
}
