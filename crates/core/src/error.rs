//! Error types for sift
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every error is raised synchronously at the call that triggers it:
//! backend lookup, query compilation, or the first consumption of a result set.

use crate::schema::FieldPurpose;
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for sift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why a field lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorReason {
    /// No field with this name is declared on the model or its ancestors
    Unknown,
    /// Field exists but is not declared searchable
    NotSearchable,
    /// Field exists but is not declared filterable
    NotFilterable,
    /// Field cannot be used for ordering (not filterable, or a relation)
    NotOrderable,
    /// A dotted path traverses a field that is not a relation
    NotARelation,
}

impl fmt::Display for FieldErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldErrorReason::Unknown => "no such field",
            FieldErrorReason::NotSearchable => "field is not searchable",
            FieldErrorReason::NotFilterable => "field is not filterable",
            FieldErrorReason::NotOrderable => "field cannot be used for ordering",
            FieldErrorReason::NotARelation => "field is not a relation",
        };
        f.write_str(s)
    }
}

/// A requested search/filter/order field does not resolve on a model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot {purpose} on field '{field}' of model '{model}': {reason}")]
pub struct FieldError {
    /// Field path as requested (may be dotted)
    pub field: String,
    /// Model the lookup started from
    pub model: String,
    /// What the field was requested for
    pub purpose: FieldPurpose,
    /// Why resolution failed
    pub reason: FieldErrorReason,
}

impl FieldError {
    /// Create a new field error
    pub fn new(
        field: impl Into<String>,
        model: impl Into<String>,
        purpose: FieldPurpose,
        reason: FieldErrorReason,
    ) -> Self {
        FieldError {
            field: field.into(),
            model: model.into(),
            purpose,
            reason,
        }
    }
}

/// Error types for sift
#[derive(Debug, Error)]
pub enum Error {
    /// Backend name, module path or class path could not be resolved
    #[error("Invalid search backend '{backend}': {reason}")]
    InvalidSearchBackend {
        /// The name or path that was requested
        backend: String,
        /// Why it could not be resolved
        reason: String,
    },

    /// Field resolution failure
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Malformed argument (e.g. a text query operator other than `and`/`or`)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Model is not declared in the schema
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Model has no searchable or filterable fields
    #[error("Model is not indexed: {0}")]
    NotIndexed(String),

    /// Invalid model declarations
    #[error("Schema error: {0}")]
    Schema(String),

    /// Record store or index store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create an invalid backend error
    pub fn invalid_backend(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidSearchBackend {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Error::InvalidValue(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Error::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Returns the field error, if this is one
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            Error::Field(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a field resolution error
    pub fn is_field_error(&self) -> bool {
        matches!(self, Error::Field(_))
    }

    /// Check if this is an invalid value error
    pub fn is_invalid_value(&self) -> bool {
        matches!(self, Error::InvalidValue(_))
    }

    /// Check if this is an invalid backend error
    pub fn is_invalid_backend(&self) -> bool {
        matches!(self, Error::InvalidSearchBackend { .. })
    }
}
