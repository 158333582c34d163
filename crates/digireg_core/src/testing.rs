//! Test helpers shared by the unit tests of this crate.

use crate::registry::Registry;
use crate::schema::{self, IDENTIFIER_SEQUENCE};
use digireg_storage::{ConnectionSource, SqliteSource, SqliteSourceConfig};
use rusqlite::Connection;
use std::sync::Arc;
use tempfile::TempDir;

/// Creates an on-disk database with the registry tables and an initialized
/// identifier sequence.
pub(crate) fn seeded_database() -> (TempDir, Arc<dyn ConnectionSource>) {
    let dir = tempfile::tempdir().unwrap();
    let config = SqliteSourceConfig::new(dir.path().join("registry.db")).create_if_missing(true);
    let source = SqliteSource::new(config).unwrap();
    let conn = source.connect().unwrap();
    schema::install(&conn).unwrap();
    conn.execute(
        "INSERT INTO plaant_ids (id, deskname) VALUES (0, ?1)",
        [IDENTIFIER_SEQUENCE],
    )
    .unwrap();
    (dir, Arc::new(source))
}

fn connect(registry: &Registry) -> Connection {
    registry.executor().source().connect().unwrap()
}

/// Inserts a record row.
pub(crate) fn insert_record(registry: &Registry, id: i64, ccnb: &str, barcode: &str, state: Option<&str>) {
    connect(registry)
        .execute(
            "INSERT INTO predloha (id, ccnb, carkod, stavrec) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, ccnb, barcode, state],
        )
        .unwrap();
}

/// State and audit columns of a record.
pub(crate) struct StoredState {
    pub state: Option<String>,
    pub finished: Option<String>,
    pub finisher: Option<String>,
    pub edited: Option<String>,
    pub editor: Option<String>,
}

pub(crate) fn stored_state(registry: &Registry, id: i64) -> StoredState {
    connect(registry)
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
        .unwrap()
}

/// One identifier row.
pub(crate) struct IdentifierRow {
    pub id: i64,
    pub urn: String,
    pub relief: bool,
}

/// Identifier rows of a record, in key order.
pub(crate) fn identifier_rows(registry: &Registry, record: i64) -> Vec<IdentifierRow> {
    let conn = connect(registry);
    let mut stmt = conn
        .prepare(
            "SELECT id, urnnbn, rpredloha_urnnbnmf FROM urnnbn \
             WHERE rpredloha_urnnbn = ?1 ORDER BY id",
        )
        .unwrap();
    let rows = stmt
        .query_map([record], |row| {
            Ok(IdentifierRow {
                id: row.get(0)?,
                urn: row.get(1)?,
                relief: row.get::<_, i64>(2)? == 1,
            })
        })
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap();
    rows
}
