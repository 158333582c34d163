//! # Digireg Testkit
//!
//! Test utilities for the digitization registry.
//!
//! This crate provides:
//! - Temporary on-disk registries with seeding and inspection helpers
//! - Connection sources that fail on demand
//! - Concurrency stress drivers for allocation and state races
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use digireg_core::{IdentifierSet, RecordLocator};
//! use digireg_testkit::prelude::*;
//!
//! let registry = TestRegistry::new();
//! registry.insert_record(1, "cnb000000001", "2610000001", None);
//! let identifiers: IdentifierSet = ["urn:nbn:cz:nk-000001"].into_iter().collect();
//! assert!(registry.add_identifiers(RecordLocator::id(1), None, identifiers).unwrap());
//! assert_eq!(registry.identifier_rows(1).len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod flaky;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::flaky::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use flaky::*;
pub use generators::*;
pub use stress::*;
