//! Error types for the Quarry library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`QuarryError`] enum. Ingestion errors leave the index untouched, query
//! errors never produce a partial iterator.
//!
//! # Examples
//!
//! ```
//! use quarry::error::{ErrorKind, QuarryError, Result};
//!
//! fn declare() -> Result<()> {
//!     Err(QuarryError::duplicate_field("title"))
//! }
//!
//! match declare() {
//!     Err(e) => assert_eq!(e.kind(), ErrorKind::DuplicateField),
//!     Ok(_) => unreachable!(),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Quarry operations.
#[derive(Error, Debug)]
pub enum QuarryError {
    /// A field with the same name already exists with incompatible type flags.
    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    /// A value was submitted as a type its field was never declared with,
    /// or a query node targets a field of the wrong type.
    #[error("Field type mismatch: {0}")]
    FieldTypeMismatch(String),

    /// A query references a field that is not declared on the index.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The query string or query node tree is malformed.
    #[error("Syntax error at offset {offset}: {message}")]
    QuerySyntax {
        /// Human readable description.
        message: String,
        /// Byte offset into the query string (0 for node trees).
        offset: usize,
    },

    /// A document failed validation (empty or duplicate external id).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// No index is registered under the given name.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// An argument was outside of its accepted domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An internal invariant was violated while reading the index.
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors (configuration files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless discriminant of [`QuarryError`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateField,
    FieldTypeMismatch,
    UnknownField,
    QuerySyntax,
    InvalidDocument,
    IndexNotFound,
    InvalidArgument,
    Internal,
    Io,
    Json,
}

/// Result type alias for operations that may fail with QuarryError.
pub type Result<T> = std::result::Result<T, QuarryError>;

impl QuarryError {
    /// Create a new duplicate field error.
    pub fn duplicate_field<S: Into<String>>(msg: S) -> Self {
        QuarryError::DuplicateField(msg.into())
    }

    /// Create a new field type mismatch error.
    pub fn type_mismatch<S: Into<String>>(msg: S) -> Self {
        QuarryError::FieldTypeMismatch(msg.into())
    }

    /// Create a new unknown field error.
    pub fn unknown_field<S: Into<String>>(msg: S) -> Self {
        QuarryError::UnknownField(msg.into())
    }

    /// Create a new syntax error at the given byte offset.
    pub fn syntax<S: Into<String>>(msg: S, offset: usize) -> Self {
        QuarryError::QuerySyntax {
            message: msg.into(),
            offset,
        }
    }

    /// Create a new invalid document error.
    pub fn invalid_document<S: Into<String>>(msg: S) -> Self {
        QuarryError::InvalidDocument(msg.into())
    }

    /// Create a new index not found error.
    pub fn index_not_found<S: Into<String>>(msg: S) -> Self {
        QuarryError::IndexNotFound(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        QuarryError::InvalidArgument(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        QuarryError::Internal(msg.into())
    }

    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuarryError::DuplicateField(_) => ErrorKind::DuplicateField,
            QuarryError::FieldTypeMismatch(_) => ErrorKind::FieldTypeMismatch,
            QuarryError::UnknownField(_) => ErrorKind::UnknownField,
            QuarryError::QuerySyntax { .. } => ErrorKind::QuerySyntax,
            QuarryError::InvalidDocument(_) => ErrorKind::InvalidDocument,
            QuarryError::IndexNotFound(_) => ErrorKind::IndexNotFound,
            QuarryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            QuarryError::Internal(_) => ErrorKind::Internal,
            QuarryError::Io(_) => ErrorKind::Io,
            QuarryError::Json(_) => ErrorKind::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = QuarryError::duplicate_field("title");
        assert_eq!(error.to_string(), "Duplicate field: title");
        assert_eq!(error.kind(), ErrorKind::DuplicateField);

        let error = QuarryError::syntax("unexpected ')'", 7);
        assert_eq!(error.to_string(), "Syntax error at offset 7: unexpected ')'");
        assert_eq!(error.kind(), ErrorKind::QuerySyntax);

        let error = QuarryError::unknown_field("body");
        assert_eq!(error.kind(), ErrorKind::UnknownField);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let quarry_error = QuarryError::from(io_error);

        match quarry_error {
            QuarryError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }
}
