//! # Digireg Storage
//!
//! Connection sources for the digitization registry.
//!
//! This crate provides the lowest-level database abstraction: something that
//! hands out fresh SQLite connections. Sources do not know about records,
//! states or identifiers; transaction handling and statements belong to
//! `digireg_core`.
//!
//! ## Design Principles
//!
//! - One connection per unit of work, closed when the work ends
//! - Sources must be `Send + Sync` so concurrent callers can share them
//! - Retry policy lives in the caller, sources only report whether an error
//!   is worth retrying
//!
//! ## Available Sources
//!
//! - [`SqliteSource`] - File-backed SQLite database
//! - [`MemorySource`] - Named shared-cache in-memory database, for tests
//!
//! ## Example
//!
//! ```rust
//! use digireg_storage::{ConnectionSource, MemorySource};
//!
//! let source = MemorySource::new().unwrap();
//! let conn = source.connect().unwrap();
//! let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
//! assert_eq!(one, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod source;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemorySource;
pub use source::ConnectionSource;
pub use sqlite::{SqliteSource, SqliteSourceConfig};
