//! Digitization states and their on-disk vocabulary.

use crate::schema::SchemaVariant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digitization state of a record.
///
/// `Undefined` is never written. It is what unrecognized or missing state
/// text resolves to, and what callers pass as the previous state of a record
/// that has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DigitizationState {
    /// Planned for digitization.
    Scheduled,
    /// Being digitized.
    InProgress,
    /// Digitization finished.
    Finished,
    /// No recognized state.
    Undefined,
}

impl DigitizationState {
    /// All states, sentinel last.
    pub const ALL: [DigitizationState; 4] = [
        DigitizationState::Scheduled,
        DigitizationState::InProgress,
        DigitizationState::Finished,
        DigitizationState::Undefined,
    ];

    /// Returns the external name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DigitizationState::Scheduled => "SCHEDULED",
            DigitizationState::InProgress => "IN_PROGRESS",
            DigitizationState::Finished => "FINISHED",
            DigitizationState::Undefined => "UNDEFINED",
        }
    }

    /// Returns true for the `Undefined` sentinel.
    #[must_use]
    pub const fn is_undefined(self) -> bool {
        matches!(self, DigitizationState::Undefined)
    }
}

impl fmt::Display for DigitizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown external state name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown digitization state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for DigitizationState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DigitizationState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Mapping between states and the strings stored in the state column.
///
/// Several historical strings may resolve to one state; each state has one
/// canonical string that is written on update.
#[derive(Debug)]
pub struct StateVocabulary {
    canonical: [(DigitizationState, &'static str); 3],
    accepted: &'static [(&'static str, DigitizationState)],
}

static SURROGATE_VOCABULARY: StateVocabulary = StateVocabulary {
    canonical: [
        (DigitizationState::Scheduled, "planovane"),
        (DigitizationState::InProgress, "progress"),
        (DigitizationState::Finished, "finished"),
    ],
    accepted: &[
        ("planovane", DigitizationState::Scheduled),
        ("progress", DigitizationState::InProgress),
        ("active", DigitizationState::InProgress),
        ("pripravenoProMf", DigitizationState::InProgress),
        ("predanoZpracovateli", DigitizationState::InProgress),
        ("finished", DigitizationState::Finished),
        ("archived", DigitizationState::Finished),
    ],
};

static COMPOSITE_VOCABULARY: StateVocabulary = StateVocabulary {
    canonical: [
        (DigitizationState::Scheduled, "planovane"),
        (DigitizationState::InProgress, "active"),
        (DigitizationState::Finished, "finished"),
    ],
    accepted: &[
        ("planovane", DigitizationState::Scheduled),
        ("active", DigitizationState::InProgress),
        ("progress", DigitizationState::InProgress),
        ("pripravenoProMf", DigitizationState::InProgress),
        ("predanoZpracovateli", DigitizationState::InProgress),
        ("finished", DigitizationState::Finished),
        ("archived", DigitizationState::Finished),
    ],
};

impl StateVocabulary {
    /// Returns the vocabulary used by a schema variant.
    #[must_use]
    pub fn for_schema(schema: SchemaVariant) -> &'static StateVocabulary {
        match schema {
            SchemaVariant::Surrogate => &SURROGATE_VOCABULARY,
            SchemaVariant::Composite => &COMPOSITE_VOCABULARY,
        }
    }

    /// Resolves stored state text. Unknown or missing text is `Undefined`.
    #[must_use]
    pub fn resolve(&self, stored: Option<&str>) -> DigitizationState {
        stored
            .and_then(|text| {
                self.accepted
                    .iter()
                    .find(|(accepted, _)| *accepted == text)
                    .map(|(_, state)| *state)
            })
            .unwrap_or(DigitizationState::Undefined)
    }

    /// Returns the string written for a state, `None` for `Undefined`.
    #[must_use]
    pub fn encode(&self, state: DigitizationState) -> Option<&'static str> {
        self.canonical
            .iter()
            .find(|(candidate, _)| *candidate == state)
            .map(|(_, text)| *text)
    }

    /// Returns every stored string that resolves to `state`.
    pub fn encodings(&self, state: DigitizationState) -> impl Iterator<Item = &'static str> + '_ {
        self.accepted
            .iter()
            .filter(move |(_, candidate)| *candidate == state)
            .map(|(text, _)| *text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn legacy_strings_resolve() {
        let vocab = StateVocabulary::for_schema(SchemaVariant::Surrogate);
        assert_eq!(vocab.resolve(Some("archived")), DigitizationState::Finished);
        assert_eq!(
            vocab.resolve(Some("predanoZpracovateli")),
            DigitizationState::InProgress
        );
        assert_eq!(vocab.resolve(Some("planovane")), DigitizationState::Scheduled);
        assert_eq!(vocab.resolve(Some("bogus")), DigitizationState::Undefined);
        assert_eq!(vocab.resolve(None), DigitizationState::Undefined);
    }

    #[test]
    fn canonical_values_per_schema() {
        let surrogate = StateVocabulary::for_schema(SchemaVariant::Surrogate);
        let composite = StateVocabulary::for_schema(SchemaVariant::Composite);
        assert_eq!(surrogate.encode(DigitizationState::InProgress), Some("progress"));
        assert_eq!(composite.encode(DigitizationState::InProgress), Some("active"));
        assert_eq!(surrogate.encode(DigitizationState::Undefined), None);
    }

    #[test]
    fn encodings_lists_all_forms() {
        let vocab = StateVocabulary::for_schema(SchemaVariant::Surrogate);
        let forms: Vec<_> = vocab.encodings(DigitizationState::Finished).collect();
        assert_eq!(forms, vec!["finished", "archived"]);
        assert_eq!(vocab.encodings(DigitizationState::Undefined).count(), 0);
    }

    #[test]
    fn parse_external_names() {
        assert_eq!(
            "in_progress".parse::<DigitizationState>().unwrap(),
            DigitizationState::InProgress
        );
        assert!("DONE".parse::<DigitizationState>().is_err());
        assert_eq!(
            serde_json::to_string(&DigitizationState::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
    }

    proptest! {
        #[test]
        fn canonical_value_round_trips(idx in 0usize..3, composite in any::<bool>()) {
            let schema = if composite { SchemaVariant::Composite } else { SchemaVariant::Surrogate };
            let vocab = StateVocabulary::for_schema(schema);
            let state = DigitizationState::ALL[idx];
            let stored = vocab.encode(state);
            prop_assert_eq!(vocab.resolve(stored), state);
        }

        #[test]
        fn unknown_text_is_undefined(text in "[A-Z]{1,12}") {
            let vocab = StateVocabulary::for_schema(SchemaVariant::Surrogate);
            prop_assert_eq!(vocab.resolve(Some(&text)), DigitizationState::Undefined);
        }
    }
}
