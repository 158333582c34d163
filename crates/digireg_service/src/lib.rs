//! # Digireg Service
//!
//! Validated service boundary for the digitization registry.
//!
//! This crate provides:
//! - Parameter validation with accumulated failure messages
//! - Write-permission checks against the caller's roles
//! - Descriptor conversion to the requested record format
//! - Opaque internal errors, with causes logged where they occur
//! - Sequence counter initialization on startup
//!
//! # Example
//!
//! ```rust
//! use digireg_core::{schema, DataSourceConfig, DigitizationState, Registry};
//! use digireg_service::{Caller, RegistryService, ServiceConfig};
//! use digireg_storage::{ConnectionSource, MemorySource};
//! use std::sync::Arc;
//!
//! let source = Arc::new(MemorySource::new().unwrap());
//! let conn = source.connect().unwrap();
//! schema::install(&conn).unwrap();
//! conn.execute("INSERT INTO predloha (id, stavrec) VALUES (1, 'planovane')", [])
//!     .unwrap();
//!
//! let registry = Registry::new(source, DataSourceConfig::default());
//! let service = RegistryService::new(registry, ServiceConfig::default());
//! service.start().unwrap();
//!
//! let scanner = Caller::new("scanner").with_role("registry-ws");
//! let moved = service
//!     .set_record_state(
//!         &scanner,
//!         1,
//!         Some(DigitizationState::InProgress),
//!         Some(DigitizationState::Scheduled),
//!         None,
//!         None,
//!     )
//!     .unwrap();
//! assert!(moved);
//! ```
//!
//! # Errors
//!
//! Callers see three kinds of failure: invalid requests (one message per
//! line), forbidden writes, and a generic internal error. Data source and
//! conversion failures never leak their details.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod caller;
mod config;
mod error;
mod format;
mod service;
mod validation;

pub use caller::Caller;
pub use config::{ServiceConfig, DEFAULT_WRITE_ROLE};
pub use error::{ServiceError, ServiceResult, FORBIDDEN_MESSAGE, INTERNAL_ERROR_MESSAGE};
pub use format::{
    DescriptorTransformer, MarcTransformer, RecordFormat, StylesheetEngine, TransformError,
    UnknownFormat,
};
pub use service::RegistryService;
