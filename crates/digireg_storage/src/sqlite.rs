//! File-backed SQLite connection source.

use crate::error::{StorageError, StorageResult};
use crate::source::ConnectionSource;
use rusqlite::{Connection, OpenFlags};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a [`SqliteSource`].
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteSourceConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// How long a connection waits on a locked database before failing.
    #[serde(default = "default_busy_timeout", with = "millis")]
    pub busy_timeout: Duration,
    /// Whether to enforce foreign keys on each connection.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
    /// Whether to create the database file if it is missing.
    #[serde(default)]
    pub create_if_missing: bool,
}

fn default_busy_timeout() -> Duration {
    Duration::from_secs(5)
}

const fn default_foreign_keys() -> bool {
    true
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

impl SqliteSourceConfig {
    /// Creates a configuration for the given database file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: default_busy_timeout(),
            foreign_keys: default_foreign_keys(),
            create_if_missing: false,
        }
    }

    /// Sets the busy timeout.
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether foreign keys are enforced.
    #[must_use]
    pub fn foreign_keys(mut self, value: bool) -> Self {
        self.foreign_keys = value;
        self
    }

    /// Sets whether a missing database file is created.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }
}

/// A connection source backed by a SQLite database file.
///
/// Each connection is opened with the configured busy timeout so that
/// concurrent writers queue on the database lock instead of failing at once.
///
/// # Example
///
/// ```no_run
/// use digireg_storage::{ConnectionSource, SqliteSource, SqliteSourceConfig};
///
/// let source = SqliteSource::new(SqliteSourceConfig::new("registry.db")).unwrap();
/// let conn = source.connect().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SqliteSource {
    config: SqliteSourceConfig,
}

impl SqliteSource {
    /// Creates a source after validating the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if the path is empty, points to a
    /// directory, or does not exist while `create_if_missing` is off.
    pub fn new(config: SqliteSourceConfig) -> StorageResult<Self> {
        validate_path(&config.path, config.create_if_missing)?;
        Ok(Self { config })
    }

    /// Opens a file source with default settings.
    ///
    /// # Errors
    ///
    /// See [`SqliteSource::new`].
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        Self::new(SqliteSourceConfig::new(path))
    }

    /// Returns the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn flags(&self) -> OpenFlags {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        flags
    }
}

impl ConnectionSource for SqliteSource {
    fn connect(&self) -> StorageResult<Connection> {
        let conn = Connection::open_with_flags(&self.config.path, self.flags())?;
        apply_pragmas(&conn, self.config.busy_timeout, self.config.foreign_keys)?;
        Ok(conn)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.config.path.display())
    }
}

/// Applies per-connection settings shared by all sources.
pub(crate) fn apply_pragmas(
    conn: &Connection,
    busy_timeout: Duration,
    foreign_keys: bool,
) -> StorageResult<()> {
    conn.busy_timeout(busy_timeout)?;
    let pragma = if foreign_keys {
        "PRAGMA foreign_keys = ON;"
    } else {
        "PRAGMA foreign_keys = OFF;"
    };
    conn.execute_batch(pragma)?;
    Ok(())
}

fn validate_path(path: &Path, create_if_missing: bool) -> StorageResult<()> {
    if path.as_os_str().is_empty() {
        return Err(StorageError::InvalidPath("path must not be empty".into()));
    }
    if path.is_dir() {
        return Err(StorageError::InvalidPath(format!(
            "{} is a directory",
            path.display()
        )));
    }
    if !create_if_missing && !path.exists() {
        return Err(StorageError::InvalidPath(format!(
            "{} does not exist",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_and_connect() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let source = SqliteSource::new(SqliteSourceConfig::new(&path).create_if_missing(true))
            .unwrap();

        let conn = source.connect().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        drop(conn);

        assert!(path.exists());
        let conn = source.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn missing_file_rejected() {
        let dir = tempdir().unwrap();
        let err = SqliteSource::open(dir.path().join("missing.db")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn directory_rejected() {
        let dir = tempdir().unwrap();
        let err = SqliteSource::new(SqliteSourceConfig::new(dir.path()).create_if_missing(true))
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    }

    #[test]
    fn foreign_keys_enabled_by_default() {
        let dir = tempdir().unwrap();
        let source = SqliteSource::new(
            SqliteSourceConfig::new(dir.path().join("fk.db")).create_if_missing(true),
        )
        .unwrap();
        let conn = source.connect().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn config_from_json() {
        let config: SqliteSourceConfig =
            serde_json::from_str(r#"{"path": "/tmp/x.db", "busy_timeout": 250}"#).unwrap();
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(config.foreign_keys);
        assert!(!config.create_if_missing);
    }
}
