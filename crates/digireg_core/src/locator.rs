//! Record addressing.

use rusqlite::types::Value;
use std::fmt;

/// Address of a single record.
///
/// Deployments address records either by the surrogate key or by the
/// (CCNB, barcode) pair. Queries branch on the variant when building their
/// `WHERE` clauses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordLocator {
    /// Surrogate integer key.
    Id(i64),
    /// Czech national bibliography number and barcode.
    Composite {
        /// CCNB of the record.
        ccnb: String,
        /// Barcode of the physical item.
        barcode: String,
    },
}

impl RecordLocator {
    /// Creates a locator for a surrogate key.
    #[must_use]
    pub const fn id(id: i64) -> Self {
        Self::Id(id)
    }

    /// Creates a locator for a (CCNB, barcode) pair.
    pub fn composite(ccnb: impl Into<String>, barcode: impl Into<String>) -> Self {
        Self::Composite {
            ccnb: ccnb.into(),
            barcode: barcode.into(),
        }
    }

    /// Returns the surrogate key if this locator carries one.
    #[must_use]
    pub const fn as_id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Composite { .. } => None,
        }
    }

    /// SQL predicate selecting the record, with `?` placeholders.
    pub(crate) fn predicate(&self) -> &'static str {
        match self {
            Self::Id(_) => "id = ?",
            Self::Composite { .. } => "ccnb = ? AND carkod = ?",
        }
    }

    /// Parameter values for [`predicate`](Self::predicate), in order.
    pub(crate) fn values(&self) -> Vec<Value> {
        match self {
            Self::Id(id) => vec![Value::Integer(*id)],
            Self::Composite { ccnb, barcode } => {
                vec![Value::Text(ccnb.clone()), Value::Text(barcode.clone())]
            }
        }
    }
}

impl From<i64> for RecordLocator {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "record:{id}"),
            Self::Composite { ccnb, barcode } => write!(f, "record:{ccnb}/{barcode}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_matches_values() {
        let by_id = RecordLocator::id(42);
        assert_eq!(by_id.predicate().matches('?').count(), by_id.values().len());

        let composite = RecordLocator::composite("cnb000123", "2610001");
        assert_eq!(
            composite.predicate().matches('?').count(),
            composite.values().len()
        );
        assert_eq!(composite.as_id(), None);
    }

    #[test]
    fn display() {
        assert_eq!(RecordLocator::from(7).to_string(), "record:7");
        assert_eq!(
            RecordLocator::composite("cnb1", "b2").to_string(),
            "record:cnb1/b2"
        );
    }
}
