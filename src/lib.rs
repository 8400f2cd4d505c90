//! Sift - backend-agnostic search query engine
//!
//! Records of typed models are indexed by pluggable search backends and
//! searched with free text or a composable query algebra.
//!
//! # Quick Start
//!
//! ```ignore
//! use sift::{install, get_search_backend, RecordSet, SearchConfig, SearchOptions, Query};
//!
//! install(SearchConfig::default(), store)?;
//! let backend = get_search_backend(None)?;
//!
//! // Free text, ranked by relevance
//! let results = backend.search("JavaScript Definitive".into(), &RecordSet::of("Book"), &SearchOptions::new())?;
//!
//! // Query algebra over a filtered base set
//! let query = Query::term("javascript") & !Query::term("definitive");
//! let records = RecordSet::of("Book").filter("number_of_pages", Lookup::lt(500));
//! let results = backend.search(query.into(), &records, &SearchOptions::new())?;
//! ```
//!
//! # Architecture
//!
//! `sift-core` holds the query algebra, schema, records and record sets.
//! `sift-search` holds the backends, registry and configuration.

pub use sift_core::*;
pub use sift_search::*;
