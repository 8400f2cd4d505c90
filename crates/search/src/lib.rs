//! Search backends for sift
//!
//! This crate provides:
//! - SearchBackend / SearchIndex contracts and shared search validation
//! - DatabaseSearchBackend: in-process inverted index with BM25 ranking
//! - SearchResults: lazy, sliceable, countable result views
//! - Backend registry and `sift.toml` configuration
//! - Bulk index rebuilds
//!
//! # Usage
//!
//! ```ignore
//! use sift_search::{SearchBackend, SearchOptions, get_search_backend};
//!
//! let backend = get_search_backend(None)?;
//! let results = backend.search("Bilbo Baggins".into(), &RecordSet::of("Novel"), &SearchOptions::new())?;
//! let first_page = results.slice(..10)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod database;
pub mod document;
pub mod index;
pub mod indexing;
pub mod matcher;
pub mod registry;
pub mod results;
pub mod scorer;
pub mod tokenizer;

// Re-export commonly used types
pub use backend::{compile_search, CompiledSearch, SearchBackend, SearchIndex, SearchOptions, SearchQuery};
pub use config::{BackendConfig, SearchConfig, CONFIG_FILE_NAME};
pub use database::{DatabaseIndex, DatabaseSearchBackend};
pub use index::{IndexEntry, InvertedIndex, PostingEntry};
pub use indexing::{update_all, update_index, ReindexStats};
pub use registry::{
    clear_backend_cache, get_search_backend, get_search_backends, install, register_backend_class,
    BackendContext, BackendFactory, BackendParams, SearchBackends,
};
pub use results::{ResultSource, SearchHit, SearchResults};
pub use scorer::{BM25Scorer, Scorer, TermStats};
pub use tokenizer::{term_tokens, tokenize, tokenize_value, tokens, Tokens};
