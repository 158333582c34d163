//! Service configuration.

use serde::Deserialize;

/// Role a caller needs for operations that modify records.
pub const DEFAULT_WRITE_ROLE: &str = "registry-ws";

/// Configuration for the registry service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Upper bound on records returned by one search.
    pub result_limit: usize,
    /// Maximum length of an identifier list.
    pub max_identifiers: usize,
    /// Role required for write operations.
    pub write_role: String,
}

impl ServiceConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search result limit. Zero is treated as one.
    #[must_use]
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    /// Sets the maximum identifier list length.
    #[must_use]
    pub fn with_max_identifiers(mut self, max: usize) -> Self {
        self.max_identifiers = max;
        self
    }

    /// Sets the write role.
    #[must_use]
    pub fn with_write_role(mut self, role: impl Into<String>) -> Self {
        self.write_role = role.into();
        self
    }

    /// Returns the effective limit for a requested maximum.
    ///
    /// Requests outside `1..result_limit` get the full limit.
    pub fn effective_limit(&self, requested: Option<i64>) -> usize {
        match requested.and_then(|max| usize::try_from(max).ok()) {
            Some(max) if max > 0 && max < self.result_limit => max,
            _ => self.result_limit,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            result_limit: 1000,
            max_identifiers: 1000,
            write_role: DEFAULT_WRITE_ROLE.to_string(),
        }
    }
}
