//! Persisted table layout.
//!
//! The registry shares its database with the cataloguing system that creates
//! records, so table and column names follow that system's conventions:
//!
//! - `predloha`: records. `id` surrogate key, `stavrec` state text, `xml`
//!   MARC-XML descriptor, search columns `carkod` (barcode), `ccnb`, `isbn`,
//!   `issn`, `rokvyd` (issue date), `signatura`, `nazev` (title), `rocnikper`
//!   (volume), `pole001`, and the audit columns `findate`/`finuser` (finished
//!   digitization) and `edidate`/`ediuser` (last edit).
//! - `urnnbn`: identifiers. `id` minted key, `rpredloha_urnnbn` owning record,
//!   `urnnbn` identifier text, `awarddate`, `rpredloha_urnnbnmf` relief flag.
//! - `plaant_ids`: named counters. `deskname` name, `id` current value.

use rusqlite::Connection;
use serde::Deserialize;

/// Counter row used to mint identifier primary keys.
pub const IDENTIFIER_SEQUENCE: &str = "cz.incad.rd.URNNBN";

/// Table layout variant of a deployment.
///
/// Both variants keep a surrogate key on every record (identifiers reference
/// it); they differ in how callers address records and in the state strings
/// written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// Records addressed by surrogate integer id.
    #[default]
    Surrogate,
    /// Records addressed by (CCNB, barcode).
    Composite,
}

const INSTALL_SQL: &str = "
CREATE TABLE IF NOT EXISTS predloha (
    id        INTEGER PRIMARY KEY,
    stavrec   TEXT,
    xml       TEXT,
    carkod    TEXT,
    ccnb      TEXT,
    isbn      TEXT,
    issn      TEXT,
    rokvyd    TEXT,
    signatura TEXT,
    nazev     TEXT,
    rocnikper TEXT,
    pole001   TEXT,
    findate   TEXT,
    finuser   TEXT,
    edidate   TEXT,
    ediuser   TEXT
);
CREATE INDEX IF NOT EXISTS predloha_ccnb_carkod ON predloha (ccnb, carkod);
CREATE TABLE IF NOT EXISTS urnnbn (
    id                 INTEGER PRIMARY KEY,
    rpredloha_urnnbn   INTEGER NOT NULL REFERENCES predloha (id),
    urnnbn             TEXT NOT NULL,
    awarddate          TEXT,
    rpredloha_urnnbnmf INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS urnnbn_record ON urnnbn (rpredloha_urnnbn);
CREATE TABLE IF NOT EXISTS plaant_ids (
    id       INTEGER NOT NULL,
    deskname TEXT PRIMARY KEY
);
";

/// Creates the registry tables if they do not exist.
///
/// Existing tables are left untouched; this never alters a deployed schema.
///
/// # Errors
///
/// Returns an error if SQLite rejects the DDL.
pub fn install(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(INSTALL_SQL)
}
