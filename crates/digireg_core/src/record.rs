//! Records, search filters and descriptor assembly.

use crate::locator::RecordLocator;
use crate::schema::SchemaVariant;
use crate::state::{DigitizationState, StateVocabulary};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, trace};

const COLLECTION_TAG: &str = "<collection";

const MARCXML_NAMESPACE: &str = concat!(
    " xmlns='http://www.loc.gov/MARC21/slim'",
    " xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance'",
    " xsi:schemaLocation='http://www.loc.gov/MARC21/slim",
    " http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd'",
);

/// Adds the MARC21 namespace declarations to a bare `<collection>` tag.
///
/// Only the first `<collection` start tag is inspected, and only when it is
/// closed immediately (`<collection>`). Tags that already carry attributes,
/// and documents without such a tag, are returned unchanged.
#[must_use]
pub fn repair_namespace(xml: &str) -> Cow<'_, str> {
    let Some(start) = xml.find(COLLECTION_TAG) else {
        return Cow::Borrowed(xml);
    };
    let insert_at = start + COLLECTION_TAG.len();
    if xml.as_bytes().get(insert_at) != Some(&b'>') {
        return Cow::Borrowed(xml);
    }

    let mut repaired = String::with_capacity(xml.len() + MARCXML_NAMESPACE.len());
    repaired.push_str(&xml[..insert_at]);
    repaired.push_str(MARCXML_NAMESPACE);
    repaired.push_str(&xml[insert_at..]);
    Cow::Owned(repaired)
}

/// A MARC-XML document describing a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor(String);

impl Descriptor {
    /// Wraps stored descriptor text, repairing its namespace.
    ///
    /// Returns `None` for missing or empty text.
    #[must_use]
    pub fn from_stored(raw: Option<String>) -> Option<Self> {
        match raw {
            Some(text) if !text.is_empty() => {
                let fixed = match repair_namespace(&text) {
                    Cow::Owned(fixed) => Some(fixed),
                    Cow::Borrowed(_) => None,
                };
                Some(Self(fixed.unwrap_or(text)))
            }
            _ => None,
        }
    }

    /// Wraps an already converted document.
    #[must_use]
    pub fn new(document: String) -> Self {
        Self(document)
    }

    /// Returns the document text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the descriptor, returning the document text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// A digitization record as returned by searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Surrogate key.
    pub id: i64,
    /// CCNB, if recorded.
    pub ccnb: Option<String>,
    /// Barcode, if recorded.
    pub barcode: Option<String>,
    /// Resolved digitization state.
    pub state: DigitizationState,
    /// MARC-XML descriptor, if the record has one.
    pub descriptor: Option<Descriptor>,
}

impl Record {
    /// Returns the address callers of the given schema use for this record.
    ///
    /// Composite deployments fall back to the surrogate key when the record
    /// lacks a CCNB or barcode.
    #[must_use]
    pub fn locator(&self, schema: SchemaVariant) -> RecordLocator {
        match (schema, &self.ccnb, &self.barcode) {
            (SchemaVariant::Composite, Some(ccnb), Some(barcode)) => {
                RecordLocator::composite(ccnb.clone(), barcode.clone())
            }
            _ => RecordLocator::Id(self.id),
        }
    }
}

/// Raw column values of a record row.
#[derive(Debug)]
pub(crate) struct RawRecord {
    pub id: i64,
    pub ccnb: Option<String>,
    pub barcode: Option<String>,
    pub state: Option<String>,
    pub descriptor: Option<String>,
}

impl RawRecord {
    /// Reads a row selected as `id, ccnb, carkod, stavrec, xml`.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ccnb: row.get(1)?,
            barcode: row.get(2)?,
            state: row.get(3)?,
            descriptor: row.get(4)?,
        })
    }

    /// Builds the public record, resolving the state and repairing the
    /// descriptor.
    pub fn assemble(self, vocabulary: &StateVocabulary) -> Record {
        debug!(
            id = self.id,
            state = self.state.as_deref().unwrap_or("<null>"),
            descriptor_len = self.descriptor.as_ref().map_or(-1, |xml| xml.len() as i64),
            "assembling record"
        );
        if let Some(xml) = &self.descriptor {
            trace!(id = self.id, "{xml}");
        }
        Record {
            id: self.id,
            state: vocabulary.resolve(self.state.as_deref()),
            descriptor: Descriptor::from_stored(self.descriptor),
            ccnb: self.ccnb,
            barcode: self.barcode,
        }
    }
}

/// Search criteria for records.
///
/// Each non-empty field adds an equality condition; the conditions are
/// combined with `AND`. Empty and missing fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    /// Barcode.
    pub barcode: Option<String>,
    /// Czech national bibliography number.
    pub ccnb: Option<String>,
    /// ISBN.
    pub isbn: Option<String>,
    /// ISSN.
    pub issn: Option<String>,
    /// Issue date.
    pub issue_date: Option<String>,
    /// Shelf signature.
    pub signature: Option<String>,
    /// Title.
    pub title: Option<String>,
    /// Periodical volume.
    pub volume: Option<String>,
    /// MARC field 001.
    pub field001: Option<String>,
}

macro_rules! filter_setter {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[must_use]
        pub fn $name(mut self, value: impl Into<String>) -> Self {
            self.$name = Some(value.into());
            self
        }
    };
}

impl RecordFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    filter_setter!(barcode, "Sets the barcode condition.");
    filter_setter!(ccnb, "Sets the CCNB condition.");
    filter_setter!(isbn, "Sets the ISBN condition.");
    filter_setter!(issn, "Sets the ISSN condition.");
    filter_setter!(issue_date, "Sets the issue date condition.");
    filter_setter!(signature, "Sets the signature condition.");
    filter_setter!(title, "Sets the title condition.");
    filter_setter!(volume, "Sets the volume condition.");
    filter_setter!(field001, "Sets the field 001 condition.");

    /// Returns `(column, value)` pairs for every non-empty field.
    pub(crate) fn conditions(&self) -> Vec<(&'static str, &str)> {
        [
            ("carkod", &self.barcode),
            ("ccnb", &self.ccnb),
            ("isbn", &self.isbn),
            ("issn", &self.issn),
            ("rokvyd", &self.issue_date),
            ("signatura", &self.signature),
            ("nazev", &self.title),
            ("rocnikper", &self.volume),
            ("pole001", &self.field001),
        ]
        .into_iter()
        .filter_map(|(column, value)| match value.as_deref() {
            Some(text) if !text.is_empty() => Some((column, text)),
            _ => None,
        })
        .collect()
    }

    /// Returns true if no field would constrain a search.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bare_collection_gets_namespace() {
        let xml = "<?xml version='1.0'?><collection><record/></collection>";
        let repaired = repair_namespace(xml);
        assert!(repaired.starts_with(
            "<?xml version='1.0'?><collection xmlns='http://www.loc.gov/MARC21/slim'"
        ));
        assert!(repaired.ends_with("MARC21slim.xsd'><record/></collection>"));
        assert_eq!(repaired.matches("xmlns=").count(), 1);
    }

    #[test]
    fn repaired_attributes_are_separated() {
        let repaired = repair_namespace("<collection><record/></collection>");
        assert_eq!(
            repaired,
            "<collection xmlns='http://www.loc.gov/MARC21/slim' \
             xmlns:xsi='http://www.w3.org/2001/XMLSchema-instance' \
             xsi:schemaLocation='http://www.loc.gov/MARC21/slim \
             http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd'><record/></collection>"
        );
    }

    #[test]
    fn annotated_collection_unchanged() {
        let xml = "<collection xmlns='http://www.loc.gov/MARC21/slim'><record/></collection>";
        assert!(matches!(repair_namespace(xml), Cow::Borrowed(_)));
        let other = "<collectionInfo><x/></collectionInfo>";
        assert_eq!(repair_namespace(other), other);
    }

    #[test]
    fn truncated_tag_unchanged() {
        assert_eq!(repair_namespace("<root><collection"), "<root><collection");
        assert_eq!(repair_namespace(""), "");
    }

    #[test]
    fn empty_descriptor_is_absent() {
        assert_eq!(Descriptor::from_stored(None), None);
        assert_eq!(Descriptor::from_stored(Some(String::new())), None);
        let descriptor = Descriptor::from_stored(Some("<collection></collection>".into()));
        assert!(descriptor.unwrap().as_str().contains("xsi:schemaLocation"));
    }

    #[test]
    fn filter_conditions_skip_empty_fields() {
        let filter = RecordFilter::new().barcode("").ccnb("cnb001").title("Babicka");
        let conditions = filter.conditions();
        assert_eq!(conditions, vec![("ccnb", "cnb001"), ("nazev", "Babicka")]);
        assert!(!filter.is_empty());
        assert!(RecordFilter::new().isbn("").is_empty());
    }

    #[test]
    fn record_locator_by_schema() {
        let record = Record {
            id: 5,
            ccnb: Some("cnb5".into()),
            barcode: Some("b5".into()),
            state: DigitizationState::Scheduled,
            descriptor: None,
        };
        assert_eq!(record.locator(SchemaVariant::Surrogate), RecordLocator::Id(5));
        assert_eq!(
            record.locator(SchemaVariant::Composite),
            RecordLocator::composite("cnb5", "b5")
        );
    }

    proptest! {
        #[test]
        fn repair_is_idempotent(body in "[a-z<>/ ]{0,40}") {
            let xml = format!("<collection>{body}</collection>");
            let once = repair_namespace(&xml).into_owned();
            let twice = repair_namespace(&once).into_owned();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.matches(MARCXML_NAMESPACE).count(), 1);
        }

        #[test]
        fn repair_only_inserts(xml in "[a-z<>/ ]{0,60}") {
            let repaired = repair_namespace(&xml);
            if repaired != xml.as_str() {
                prop_assert_eq!(repaired.replacen(MARCXML_NAMESPACE, "", 1), xml);
            }
        }
    }
}
