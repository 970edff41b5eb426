//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Document not found.
    #[error("document not found: {collection}/{id}")]
    DocumentNotFound { collection: String, id: String },

    /// Document failed to round-trip through its wire encoding.
    #[error("invalid document in {collection}: {message}")]
    InvalidDocument { collection: String, message: String },

    /// A predicate query could not be executed.
    #[error("query failed on {collection}: {message}")]
    QueryFailed { collection: String, message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
