//! In-memory connection source for testing.

use crate::error::StorageResult;
use crate::source::ConnectionSource;
use crate::sqlite::apply_pragmas;
use rusqlite::{Connection, OpenFlags};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

static NEXT_DATABASE: AtomicU64 = AtomicU64::new(1);

/// An in-memory SQLite database shared by all connections of this source.
///
/// The database lives as long as the source: an anchor connection keeps the
/// shared cache alive between units of work. Shared-cache databases report
/// lock conflicts immediately instead of waiting, so this source suits
/// sequential tests; concurrency tests should use a file-backed
/// [`SqliteSource`](crate::SqliteSource).
///
/// # Example
///
/// ```rust
/// use digireg_storage::{ConnectionSource, MemorySource};
///
/// let source = MemorySource::new().unwrap();
/// source.connect().unwrap().execute_batch("CREATE TABLE t (x)").unwrap();
///
/// // A second connection sees the table created by the first.
/// let count: i64 = source
///     .connect()
///     .unwrap()
///     .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
///     .unwrap();
/// assert_eq!(count, 0);
/// ```
#[derive(Debug)]
pub struct MemorySource {
    uri: String,
    _anchor: Mutex<Connection>,
}

impl MemorySource {
    /// Creates a new, empty in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot open the anchor connection.
    pub fn new() -> StorageResult<Self> {
        let id = NEXT_DATABASE.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:digireg-mem-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            id
        );
        let anchor = open_uri(&uri)?;
        Ok(Self {
            uri,
            _anchor: Mutex::new(anchor),
        })
    }
}

impl ConnectionSource for MemorySource {
    fn connect(&self) -> StorageResult<Connection> {
        open_uri(&self.uri)
    }

    fn describe(&self) -> String {
        self.uri.clone()
    }
}

fn open_uri(uri: &str) -> StorageResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(uri, flags)?;
    apply_pragmas(&conn, Duration::from_secs(1), true)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_share_database() {
        let source = MemorySource::new().unwrap();
        source
            .connect()
            .unwrap()
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);")
            .unwrap();

        let value: i64 = source
            .connect()
            .unwrap()
            .query_row("SELECT x FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn sources_are_isolated() {
        let a = MemorySource::new().unwrap();
        let b = MemorySource::new().unwrap();
        a.connect().unwrap().execute_batch("CREATE TABLE only_a (x)").unwrap();

        let exists: i64 = b
            .connect()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'only_a'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(exists, 0);
        assert_ne!(a.describe(), b.describe());
    }
}
