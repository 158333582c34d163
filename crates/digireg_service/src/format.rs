//! Descriptor formats and conversion.
//!
//! Records store MARC-XML descriptors. Callers may ask for other formats;
//! conversion to those is done by stylesheet engines registered with a
//! [`MarcTransformer`]. The service itself ships no XSLT processor.

use digireg_core::Descriptor;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Wire format of a record descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordFormat {
    /// MARC21 slim XML, as stored.
    #[default]
    MarcXml,
    /// Dublin Core in RDF.
    DcRdf,
    /// MODS 3.3.
    #[serde(rename = "MODS_33")]
    Mods33,
    /// MODS 3.4.
    #[serde(rename = "MODS_34")]
    Mods34,
}

impl RecordFormat {
    /// All formats.
    pub const ALL: [RecordFormat; 4] = [
        RecordFormat::MarcXml,
        RecordFormat::DcRdf,
        RecordFormat::Mods33,
        RecordFormat::Mods34,
    ];

    /// Returns the external name of the format.
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordFormat::MarcXml => "MARC_XML",
            RecordFormat::DcRdf => "DC_RDF",
            RecordFormat::Mods33 => "MODS_33",
            RecordFormat::Mods34 => "MODS_34",
        }
    }

    /// Library of Congress stylesheet converting MARC-XML to this format.
    pub const fn stylesheet(self) -> Option<&'static str> {
        match self {
            RecordFormat::MarcXml => None,
            RecordFormat::DcRdf => {
                Some("http://www.loc.gov/standards/marcxml/xslt/MARC21slim2RDFDC.xsl")
            }
            RecordFormat::Mods33 => Some("http://www.loc.gov/standards/mods/v3/MARC21slim2MODS3-3.xsl"),
            RecordFormat::Mods34 => Some("http://www.loc.gov/standards/mods/v3/MARC21slim2MODS3-4.xsl"),
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown record format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for RecordFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Errors from descriptor conversion.
#[derive(Debug, Error)]
pub enum TransformError {
    /// No engine can produce the format.
    #[error("cannot transform to {0}")]
    Unsupported(RecordFormat),

    /// The engine failed on the document.
    #[error("transformation to {format} failed: {message}")]
    Engine {
        /// Requested format.
        format: RecordFormat,
        /// Engine diagnostic.
        message: String,
    },
}

/// Converts descriptors to a requested format.
pub trait DescriptorTransformer: Send + Sync {
    /// Converts a MARC-XML descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the format cannot be produced.
    fn transform(&self, document: Descriptor, format: RecordFormat) -> Result<Descriptor, TransformError>;
}

/// Applies one stylesheet to MARC-XML text.
pub trait StylesheetEngine: Send + Sync {
    /// Transforms the document.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic message if the transformation fails.
    fn apply(&self, document: &str) -> Result<String, String>;
}

impl<F> StylesheetEngine for F
where
    F: Fn(&str) -> Result<String, String> + Send + Sync,
{
    fn apply(&self, document: &str) -> Result<String, String> {
        self(document)
    }
}

/// Passes MARC-XML through and delegates other formats to registered
/// engines.
#[derive(Default)]
pub struct MarcTransformer {
    engines: RwLock<HashMap<RecordFormat, Arc<dyn StylesheetEngine>>>,
}

impl fmt::Debug for MarcTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formats: Vec<_> = self.engines.read().keys().copied().collect();
        f.debug_struct("MarcTransformer")
            .field("formats", &formats)
            .finish()
    }
}

impl MarcTransformer {
    /// Creates a transformer with no engines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the engine producing `format`, replacing any previous one.
    pub fn register(&self, format: RecordFormat, engine: Arc<dyn StylesheetEngine>) {
        debug!(%format, stylesheet = format.stylesheet().unwrap_or("-"), "registering stylesheet engine");
        self.engines.write().insert(format, engine);
    }

    /// Returns true if `format` can be produced.
    pub fn supports(&self, format: RecordFormat) -> bool {
        format == RecordFormat::MarcXml || self.engines.read().contains_key(&format)
    }
}

impl DescriptorTransformer for MarcTransformer {
    fn transform(&self, document: Descriptor, format: RecordFormat) -> Result<Descriptor, TransformError> {
        if format == RecordFormat::MarcXml {
            return Ok(document);
        }
        let engine = self
            .engines
            .read()
            .get(&format)
            .cloned()
            .ok_or(TransformError::Unsupported(format))?;
        engine
            .apply(document.as_str())
            .map(Descriptor::new)
            .map_err(|message| TransformError::Engine { format, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marc() -> Descriptor {
        Descriptor::new("<collection><record/></collection>".to_string())
    }

    #[test]
    fn marc_passes_through() {
        let transformer = MarcTransformer::new();
        let out = transformer.transform(marc(), RecordFormat::MarcXml).unwrap();
        assert_eq!(out, marc());
    }

    #[test]
    fn missing_engine_is_unsupported() {
        let transformer = MarcTransformer::new();
        assert!(!transformer.supports(RecordFormat::Mods34));
        let err = transformer.transform(marc(), RecordFormat::Mods34).unwrap_err();
        assert!(matches!(err, TransformError::Unsupported(RecordFormat::Mods34)));
    }

    #[test]
    fn registered_engine_is_used() {
        let transformer = MarcTransformer::new();
        transformer.register(
            RecordFormat::DcRdf,
            Arc::new(|doc: &str| -> Result<String, String> {
                Ok(format!("<rdf:RDF>{}</rdf:RDF>", doc.len()))
            }),
        );
        transformer.register(
            RecordFormat::Mods33,
            Arc::new(|_: &str| -> Result<String, String> {
                Err("stylesheet not found".to_string())
            }),
        );

        let out = transformer.transform(marc(), RecordFormat::DcRdf).unwrap();
        assert_eq!(out.as_str(), "<rdf:RDF>34</rdf:RDF>");

        let err = transformer.transform(marc(), RecordFormat::Mods33).unwrap_err();
        assert!(err.to_string().contains("stylesheet not found"));
    }

    #[test]
    fn format_names() {
        assert_eq!("mods_33".parse::<RecordFormat>().unwrap(), RecordFormat::Mods33);
        assert!("PDF".parse::<RecordFormat>().is_err());
        assert_eq!(
            serde_json::to_string(&RecordFormat::Mods34).unwrap(),
            "\"MODS_34\""
        );
        assert_eq!(
            serde_json::to_string(&RecordFormat::DcRdf).unwrap(),
            "\"DC_RDF\""
        );
        assert_eq!(RecordFormat::default(), RecordFormat::MarcXml);
    }
}
