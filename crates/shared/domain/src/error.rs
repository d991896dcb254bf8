//! Domain-level errors.
//!
//! These errors describe why a payload or identifier is not acceptable.
//! They are independent of infrastructure concerns (HTTP, database); the
//! service layer decides which taxonomy kind each one becomes.

use thiserror::Error;

/// Domain-specific errors for malformed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Identifier does not match `USER-[0-9A-F]{32}`
    #[error("Wrong user UUID: {0}")]
    InvalidUuid(String),

    /// Email does not match the accepted shape
    #[error("Wrong user email: {0}")]
    InvalidEmail(String),

    /// Payload violates the declared object schema
    #[error("Schema violation: {0}")]
    Schema(String),

    /// Schema definition itself could not be loaded or understood
    #[error("Invalid schema definition: {0}")]
    Definition(String),
}

impl DomainError {
    /// Create a schema violation error
    pub fn schema(msg: impl Into<String>) -> Self {
        DomainError::Schema(msg.into())
    }

    /// Create a schema definition error
    pub fn definition(msg: impl Into<String>) -> Self {
        DomainError::Definition(msg.into())
    }
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
