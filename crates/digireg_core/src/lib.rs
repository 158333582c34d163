//! # Digireg Core
//!
//! Transactional data access for the digitization registry.
//!
//! This crate provides:
//! - A unit-of-work executor running one statement per transaction
//! - Query objects for searching records, reading and updating their
//!   digitization state, and allocating persistent identifiers
//! - A sequence allocator minting identifier keys under a row lock
//! - The state vocabulary of both table layouts
//! - Record assembly with MARC-XML namespace repair
//!
//! ## Consistency
//!
//! State updates are optimistic: they only apply while the record is still in
//! the state the caller observed, and report `false` otherwise. Identifier
//! allocation locks the sequence counter row until commit, so concurrent
//! allocations never mint the same key.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod executor;
mod identifier;
mod locator;
pub mod query;
mod record;
mod registry;
pub mod schema;
mod state;

#[cfg(test)]
mod testing;

pub use config::{DataSourceConfig, DEFAULT_CONNECT_ATTEMPTS, DEFAULT_SYSTEM_OPERATOR};
pub use error::{CoreError, CoreResult, DataSourceError, DataSourceResult};
pub use executor::QueryExecutor;
pub use identifier::{AllocationMode, IdentifierSet};
pub use locator::RecordLocator;
pub use query::{PreparedQuery, StateChange};
pub use record::{repair_namespace, Descriptor, Record, RecordFilter};
pub use registry::Registry;
pub use schema::{SchemaVariant, IDENTIFIER_SEQUENCE};
pub use state::{DigitizationState, StateVocabulary, UnknownState};
