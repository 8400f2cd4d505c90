//! Core types for sift
//!
//! This crate defines the backend-independent half of the search engine:
//! - Query: the query expression algebra and its normalized form
//! - Schema: per-type field specifications and field lookup resolution
//! - Record / RecordStore: the records being searched and where they live
//! - RecordSet: lazily evaluated base record sets with filters and ordering
//! - Value: scalar field values
//! - Error: error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod query;
pub mod record;
pub mod record_set;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{Error, FieldError, FieldErrorReason, Result};
pub use query::{NormalizedQuery, Operator, PlainText, Query, Term, MATCH_ALL};
pub use record::Record;
pub use record_set::{InValues, Lookup, OrderBy, Predicate, RecordSet, PK_FIELD};
pub use schema::{
    ComputedFn, FieldPurpose, FieldSpec, ModelSpec, ResolvedField, Schema, SchemaBuilder,
};
pub use store::{MemoryStore, RecordStore};
pub use value::Value;
