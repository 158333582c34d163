//! Error types for the service boundary.

use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Message reported for every internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error. Please contact service admin.";

/// Message reported when the caller lacks the write role.
pub const FORBIDDEN_MESSAGE: &str =
    "Access forbidden. You don't have permission to run the operation.";

/// Errors reported to callers of the registry service.
///
/// Internal failures carry no detail; their causes are logged where they
/// happen and never leave the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request parameters are invalid. One problem per line.
    #[error("{0}")]
    InvalidRequest(String),

    /// The caller may not run the operation.
    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,

    /// Something failed inside the service.
    #[error("{}", INTERNAL_ERROR_MESSAGE)]
    Internal,
}

impl ServiceError {
    /// Returns true if the caller can fix the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::InvalidRequest(_) | ServiceError::Forbidden)
    }

    /// Returns true if the failure is on the service side.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServiceError::Internal)
    }
}
