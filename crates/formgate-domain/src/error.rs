//! Domain error types.

use thiserror::Error;

/// Domain-specific errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A raw input could not be coerced to the declared field type.
    #[error("invalid value for {field_type} field: {message}")]
    InvalidFieldValue { field_type: String, message: String },

    /// A request payload failed validation.
    #[error("validation error: {message}")]
    ValidationError { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
