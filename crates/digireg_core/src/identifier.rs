//! Persistent identifier (URN:NBN) input handling.

/// How supplied identifiers relate to the ones a record already has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationMode {
    /// Keep existing identifiers and insert only the new ones.
    Add,
    /// Replace all existing identifiers with the supplied ones.
    Set,
}

impl AllocationMode {
    /// Returns a short name for log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AllocationMode::Add => "add",
            AllocationMode::Set => "set",
        }
    }
}

/// Normalized, duplicate-free list of identifier strings.
///
/// Entries are trimmed and blank entries dropped. The first occurrence of a
/// duplicate wins, so iteration order follows the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    items: Vec<String>,
}

impl IdentifierSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from entries that may be missing.
    pub fn from_optional<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        entries.into_iter().flatten().collect()
    }

    /// Adds an identifier after trimming it. Returns false if it was blank
    /// or already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() || self.contains(trimmed) {
            return false;
        }
        self.items.push(trimmed.to_string());
        true
    }

    /// Returns true if the identifier is in the set.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.items.iter().any(|item| item == identifier)
    }

    /// Removes every identifier for which `present` returns true.
    pub fn retain_missing<F>(&mut self, mut present: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.items.retain(|item| !present(item.as_str()));
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the set has no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates identifiers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = IdentifierSet::new();
        for raw in iter {
            set.insert(raw.as_ref());
        }
        set
    }
}

impl IntoIterator for IdentifierSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
