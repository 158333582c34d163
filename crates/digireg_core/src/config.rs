//! Data source configuration.

use crate::schema::{SchemaVariant, IDENTIFIER_SEQUENCE};
use serde::Deserialize;

/// Number of connection attempts before giving up.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;

/// Operator tag written to the edit columns by this service.
pub const DEFAULT_SYSTEM_OPERATOR: &str = "webservice";

/// Configuration for the registry data source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataSourceConfig {
    /// How many times to try acquiring a connection (at least one).
    pub connect_attempts: u32,

    /// Table layout of the deployment; selects the state vocabulary.
    pub schema: SchemaVariant,

    /// Operator recorded in the edit columns on every state update.
    pub system_operator: String,

    /// Name of the counter row used to mint identifier keys.
    pub identifier_sequence: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            schema: SchemaVariant::default(),
            system_operator: DEFAULT_SYSTEM_OPERATOR.to_string(),
            identifier_sequence: IDENTIFIER_SEQUENCE.to_string(),
        }
    }
}

impl DataSourceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of connection attempts. Zero is treated as one.
    #[must_use]
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts.max(1);
        self
    }

    /// Sets the schema variant.
    #[must_use]
    pub fn schema(mut self, schema: SchemaVariant) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the system operator tag.
    #[must_use]
    pub fn system_operator(mut self, operator: impl Into<String>) -> Self {
        self.system_operator = operator.into();
        self
    }

    /// Sets the identifier sequence counter name.
    #[must_use]
    pub fn identifier_sequence(mut self, name: impl Into<String>) -> Self {
        self.identifier_sequence = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DataSourceConfig::default();
        assert_eq!(config.connect_attempts, 10);
        assert_eq!(config.schema, SchemaVariant::Surrogate);
        assert_eq!(config.system_operator, "webservice");
        assert_eq!(config.identifier_sequence, "cz.incad.rd.URNNBN");
    }

    #[test]
    fn builder_pattern() {
        let config = DataSourceConfig::new()
            .connect_attempts(0)
            .schema(SchemaVariant::Composite)
            .system_operator("batch");

        assert_eq!(config.connect_attempts, 1);
        assert_eq!(config.schema, SchemaVariant::Composite);
        assert_eq!(config.system_operator, "batch");
    }

    #[test]
    fn partial_json() {
        let config: DataSourceConfig =
            serde_json::from_str(r#"{"schema": "composite", "connect_attempts": 3}"#).unwrap();
        assert_eq!(config.connect_attempts, 3);
        assert_eq!(config.schema, SchemaVariant::Composite);
        assert_eq!(config.system_operator, "webservice");
    }
}
