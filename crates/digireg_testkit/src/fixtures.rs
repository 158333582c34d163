//! Test fixtures and database helpers.
//!
//! A [`TestRegistry`] is an on-disk SQLite database in a temporary directory
//! with the registry tables installed, plus helpers to seed rows and read
//! back what the registry wrote.

use digireg_core::schema::{self, IDENTIFIER_SEQUENCE};
use digireg_core::{DataSourceConfig, Registry, SchemaVariant};
use digireg_storage::{ConnectionSource, SqliteSource, SqliteSourceConfig};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A registry over a temporary database, removed on drop.
pub struct TestRegistry {
    /// The registry under test.
    pub registry: Registry,
    source: Arc<dyn ConnectionSource>,
    temp_dir: TempDir,
}

/// State and audit columns of a record row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    /// Raw state text.
    pub state: Option<String>,
    /// Date digitization finished.
    pub finished: Option<String>,
    /// Operator who finished digitization.
    pub finisher: Option<String>,
    /// Date of the last edit.
    pub edited: Option<String>,
    /// Author of the last edit.
    pub editor: Option<String>,
}

/// One persisted identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierRow {
    /// Minted key.
    pub id: i64,
    /// Identifier text.
    pub urn: String,
    /// Award date as stored.
    pub awarded: Option<String>,
    /// Relief flag.
    pub relief: bool,
}

impl TestRegistry {
    /// Creates a surrogate-layout registry with the sequence counter at zero.
    pub fn new() -> Self {
        Self::with_config(DataSourceConfig::default())
    }

    /// Creates a registry for the given table layout.
    pub fn with_schema(schema: SchemaVariant) -> Self {
        Self::with_config(DataSourceConfig::default().schema(schema))
    }

    /// Creates a registry with a custom configuration. The sequence counter
    /// named by the configuration starts at zero.
    pub fn with_config(config: DataSourceConfig) -> Self {
        let registry = Self::unseeded(config);
        registry
            .connect()
            .execute(
                "INSERT INTO plaant_ids (id, deskname) VALUES (0, ?1)",
                [registry.registry.config().identifier_sequence.as_str()],
            )
            .expect("Failed to seed sequence counter");
        registry
    }

    /// Creates a registry whose database has no sequence counter row.
    pub fn unseeded(config: DataSourceConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sqlite = SqliteSourceConfig::new(temp_dir.path().join("registry.db"))
            .create_if_missing(true);
        let source: Arc<dyn ConnectionSource> =
            Arc::new(SqliteSource::new(sqlite).expect("Failed to open database"));
        schema::install(&source.connect().expect("Failed to connect"))
            .expect("Failed to install schema");
        Self {
            registry: Registry::new(Arc::clone(&source), config),
            source,
            temp_dir,
        }
    }

    /// Returns the underlying connection source.
    pub fn source(&self) -> Arc<dyn ConnectionSource> {
        Arc::clone(&self.source)
    }

    /// Returns the database file path.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("registry.db")
    }

    /// Opens a fresh connection for direct inspection.
    pub fn connect(&self) -> Connection {
        self.source.connect().expect("Failed to connect")
    }

    /// Inserts a record without a descriptor.
    pub fn insert_record(&self, id: i64, ccnb: &str, barcode: &str, state: Option<&str>) {
        self.connect()
            .execute(
                "INSERT INTO predloha (id, ccnb, carkod, stavrec) VALUES (?1, ?2, ?3, ?4)",
                params![id, ccnb, barcode, state],
            )
            .expect("Failed to insert record");
    }

    /// Stores a MARC-XML descriptor on an existing record.
    pub fn set_descriptor(&self, id: i64, xml: &str) {
        self.connect()
            .execute("UPDATE predloha SET xml = ?1 WHERE id = ?2", params![xml, id])
            .expect("Failed to store descriptor");
    }

    /// Sets a search column on an existing record.
    ///
    /// `column` must be one of the record search columns.
    pub fn set_column(&self, id: i64, column: &str, value: &str) {
        assert!(
            matches!(
                column,
                "carkod" | "ccnb" | "isbn" | "issn" | "rokvyd" | "signatura" | "nazev" | "rocnikper" | "pole001"
            ),
            "not a search column: {column}"
        );
        self.connect()
            .execute(
                &format!("UPDATE predloha SET {column} = ?1 WHERE id = ?2"),
                params![value, id],
            )
            .expect("Failed to update column");
    }

    /// Inserts an identifier row directly.
    pub fn insert_identifier(&self, id: i64, record: i64, urn: &str, relief: bool) {
        self.connect()
            .execute(
                "INSERT INTO urnnbn (id, rpredloha_urnnbn, urnnbn, rpredloha_urnnbnmf) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, record, urn, i64::from(relief)],
            )
            .expect("Failed to insert identifier");
    }

    /// Reads the state and audit columns of a record.
    pub fn stored_state(&self, id: i64) -> StoredState {
        self.connect()
            .query_row(
                "SELECT stavrec, findate, finuser, edidate, ediuser FROM predloha WHERE id = ?1",
                [id],
                |row| {
                    Ok(StoredState {
                        state: row.get(0)?,
                        finished: row.get(1)?,
                        finisher: row.get(2)?,
                        edited: row.get(3)?,
                        editor: row.get(4)?,
                    })
                },
            )
            .expect("Failed to read record")
    }

    /// Reads the identifiers of a record in key order.
    pub fn identifier_rows(&self, record: i64) -> Vec<IdentifierRow> {
        let conn = self.connect();
        let mut stmt = conn
            .prepare(
                "SELECT id, urnnbn, awarddate, rpredloha_urnnbnmf FROM urnnbn \
                 WHERE rpredloha_urnnbn = ?1 ORDER BY id",
            )
            .expect("Failed to prepare identifier query");
        let rows = stmt
            .query_map([record], |row| {
                Ok(IdentifierRow {
                    id: row.get(0)?,
                    urn: row.get(1)?,
                    awarded: row.get(2)?,
                    relief: row.get::<_, i64>(3)? == 1,
                })
            })
            .expect("Failed to query identifiers")
            .collect::<rusqlite::Result<Vec<_>>>()
            .expect("Failed to read identifiers");
        rows
    }

    /// Reads every identifier key in the database.
    pub fn all_identifier_keys(&self) -> Vec<i64> {
        let conn = self.connect();
        let mut stmt = conn
            .prepare("SELECT id FROM urnnbn ORDER BY id")
            .expect("Failed to prepare key query");
        let keys = stmt
            .query_map([], |row| row.get(0))
            .expect("Failed to query keys")
            .collect::<rusqlite::Result<Vec<i64>>>()
            .expect("Failed to read keys");
        keys
    }

    /// Reads the raw counter value.
    pub fn counter(&self) -> Option<i64> {
        let name = self.registry.config().identifier_sequence.clone();
        self.connect()
            .query_row("SELECT id FROM plaant_ids WHERE deskname = ?1", [name], |row| row.get(0))
            .ok()
    }

    /// Sets the raw counter value.
    pub fn set_counter(&self, value: i64) {
        let name = self.registry.config().identifier_sequence.clone();
        self.connect()
            .execute(
                "UPDATE plaant_ids SET id = ?1 WHERE deskname = ?2",
                params![value, name],
            )
            .expect("Failed to set counter");
    }
}

impl Default for TestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestRegistry {
    type Target = Registry;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

/// Runs a test with a seeded temporary registry.
///
/// # Example
///
/// ```rust
/// use digireg_testkit::with_test_registry;
///
/// with_test_registry(|registry| {
///     assert_eq!(registry.sequence_value().unwrap(), Some(0));
/// });
/// ```
pub fn with_test_registry<F, R>(f: F) -> R
where
    F: FnOnce(&TestRegistry) -> R,
{
    let registry = TestRegistry::new();
    f(&registry)
}

/// Sequence counter name used by default configurations.
pub const DEFAULT_SEQUENCE: &str = IDENTIFIER_SEQUENCE;
