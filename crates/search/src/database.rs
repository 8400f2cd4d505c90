//! Database-native search backend
//!
//! Keeps one in-process `InvertedIndex` per root record type, derives index
//! entries from the record store, and evaluates searches by intersecting the
//! base record set with the indexed records before matching.
//!
//! # Ordering
//!
//! - ranked searches: score descending, then primary key ascending
//! - record sets with an explicit ordering: that ordering
//! - otherwise: primary key ascending

use crate::backend::{compile_search, CompiledSearch, SearchBackend, SearchIndex, SearchOptions, SearchQuery};
use crate::document::build_entry;
use crate::index::{IndexEntry, InvertedIndex};
use crate::matcher::QueryMatcher;
use crate::registry::{BackendContext, BackendParams};
use crate::results::{ResultSource, SearchHit, SearchResults};
use crate::scorer::{BM25Scorer, Scorer, DEFAULT_B, DEFAULT_K1};
use dashmap::DashMap;
use parking_lot::Mutex;
use sift_core::{Error, Record, RecordSet, RecordStore, Result, Schema};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Module path of this backend
pub const MODULE_PATH: &str = "sift_search::database";

/// Class path of this backend
pub const BACKEND_CLASS: &str = "sift_search::database::DatabaseSearchBackend";

// ============================================================================
// DatabaseIndex
// ============================================================================

#[derive(Debug)]
enum PendingOp {
    Upsert(IndexEntry),
    Delete,
}

/// Index of one root record type
pub struct DatabaseIndex {
    model: String,
    schema: Arc<Schema>,
    store: Arc<dyn RecordStore>,
    index: InvertedIndex,
    pending: Mutex<BTreeMap<u64, PendingOp>>,
}

impl DatabaseIndex {
    fn new(model: String, store: Arc<dyn RecordStore>) -> Self {
        DatabaseIndex {
            model,
            schema: store.schema().clone(),
            store,
            index: InvertedIndex::new(),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// The underlying inverted index
    pub fn inverted(&self) -> &InvertedIndex {
        &self.index
    }

    /// Number of buffered writes awaiting `refresh`
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    fn check_family(&self, record: &Record) -> Result<()> {
        if self.schema.is_subtype(&record.model, &self.model) {
            Ok(())
        } else {
            Err(Error::invalid_value(format!(
                "record of type '{}' does not belong in the '{}' index",
                record.model, self.model
            )))
        }
    }
}

impl SearchIndex for DatabaseIndex {
    fn model(&self) -> &str {
        &self.model
    }

    fn add_item(&self, record: &Record) -> Result<()> {
        self.check_family(record)?;
        match build_entry(&self.schema, self.store.as_ref(), record)? {
            Some(entry) => {
                self.pending.lock().insert(record.pk, PendingOp::Upsert(entry));
            }
            None => debug!(model = %record.model, pk = record.pk, "no searchable fields, not indexed"),
        }
        Ok(())
    }

    fn delete_item(&self, record: &Record) -> Result<()> {
        self.check_family(record)?;
        self.pending.lock().insert(record.pk, PendingOp::Delete);
        Ok(())
    }

    fn refresh(&self) -> Result<()> {
        let pending = std::mem::take(&mut *self.pending.lock());
        let count = pending.len();
        for (pk, op) in pending {
            match op {
                PendingOp::Upsert(entry) => self.index.index_entry(entry),
                PendingOp::Delete => {
                    self.index.remove_entry(pk);
                }
            }
        }
        debug!(model = %self.model, applied = count, "index refreshed");
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.pending.lock().clear();
        self.index.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.index.total_docs()
    }
}

// ============================================================================
// DatabaseSearchBackend
// ============================================================================

/// Search backend holding its indexes in process
pub struct DatabaseSearchBackend {
    schema: Arc<Schema>,
    store: Arc<dyn RecordStore>,
    indexes: DashMap<String, Arc<DatabaseIndex>>,
    scorer: Arc<dyn Scorer>,
}

impl DatabaseSearchBackend {
    /// Create a backend over a record store with BM25 defaults
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_scorer(store, Arc::new(BM25Scorer::default()))
    }

    /// Create a backend with a custom scorer
    pub fn with_scorer(store: Arc<dyn RecordStore>, scorer: Arc<dyn Scorer>) -> Self {
        DatabaseSearchBackend {
            schema: store.schema().clone(),
            store,
            indexes: DashMap::new(),
            scorer,
        }
    }

    /// Create a backend from configuration options
    ///
    /// Reads `k1` (>= 0) and `b` (0..=1) for the BM25 scorer; other options
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for non-numeric or out-of-range values.
    pub fn from_params(store: Arc<dyn RecordStore>, params: &BackendParams) -> Result<Self> {
        let k1 = number_param(params, "k1")?.unwrap_or(DEFAULT_K1);
        let b = number_param(params, "b")?.unwrap_or(DEFAULT_B);
        if !(k1.is_finite() && k1 >= 0.0) {
            return Err(Error::config(format!("k1 must be a non-negative number, got {}", k1)));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(Error::config(format!("b must be between 0 and 1, got {}", b)));
        }
        Ok(Self::with_scorer(store, Arc::new(BM25Scorer::new(k1, b))))
    }

    /// The record store searched over
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Name of the scorer in use
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    fn index_for_root(&self, root: &str) -> Arc<DatabaseIndex> {
        self.indexes
            .entry(root.to_string())
            .or_insert_with(|| Arc::new(DatabaseIndex::new(root.to_string(), self.store.clone())))
            .clone()
    }

    fn indexed_root<'a>(&'a self, model: &'a str) -> Result<Option<&'a str>> {
        let root = self.schema.root_of(model)?;
        Ok(self.schema.has_indexed_family(root).then_some(root))
    }
}

/// Registry constructor for `DatabaseSearchBackend`
pub fn factory(context: &BackendContext, params: &BackendParams) -> Result<Arc<dyn SearchBackend>> {
    Ok(Arc::new(DatabaseSearchBackend::from_params(context.store.clone(), params)?))
}

fn number_param(params: &BackendParams, key: &str) -> Result<Option<f32>> {
    match params.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(|v| Some(v as f32))
            .ok_or_else(|| Error::config(format!("option '{}' must be a number, got {}", key, value))),
    }
}

impl SearchBackend for DatabaseSearchBackend {
    fn name(&self) -> &str {
        BACKEND_CLASS
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn search(
        &self,
        query: SearchQuery,
        records: &RecordSet,
        options: &SearchOptions,
    ) -> Result<SearchResults> {
        let Some(compiled) = compile_search(&self.schema, query, records, options)? else {
            return Ok(SearchResults::empty());
        };
        let index = self.index_for_root(self.schema.root_of(compiled.model())?);
        let source = DatabaseResults {
            index,
            schema: self.schema.clone(),
            store: self.store.clone(),
            scorer: self.scorer.clone(),
            compiled,
        };
        Ok(SearchResults::new(Arc::new(source)))
    }

    fn get_index_for_model(&self, model: &str) -> Result<Option<Arc<dyn SearchIndex>>> {
        Ok(self
            .indexed_root(model)?
            .map(|root| self.index_for_root(root) as Arc<dyn SearchIndex>))
    }

    fn add_model(&self, model: &str) -> Result<Arc<dyn SearchIndex>> {
        let root = self
            .indexed_root(model)?
            .ok_or_else(|| Error::NotIndexed(model.to_string()))?;
        Ok(self.index_for_root(root))
    }

    fn reset_index(&self) -> Result<()> {
        for index in self.indexes.iter() {
            index.reset()?;
        }
        info!(backend = BACKEND_CLASS, "search index reset");
        Ok(())
    }

    fn refresh_index(&self) -> Result<()> {
        for index in self.indexes.iter() {
            index.refresh()?;
        }
        Ok(())
    }
}

// ============================================================================
// Result evaluation
// ============================================================================

struct DatabaseResults {
    compiled: CompiledSearch,
    index: Arc<DatabaseIndex>,
    schema: Arc<Schema>,
    store: Arc<dyn RecordStore>,
    scorer: Arc<dyn Scorer>,
}

impl ResultSource for DatabaseResults {
    fn fetch(&self) -> Result<Vec<SearchHit>> {
        let base = self.compiled.records.evaluate(self.store.as_ref())?;

        let reader = self.index.inverted().reader();
        let universe: BTreeSet<u64> = base
            .iter()
            .map(|r| r.pk)
            .filter(|pk| reader.contains(*pk))
            .collect();
        let scores = QueryMatcher::new(
            &reader,
            &universe,
            self.compiled.fields.as_deref(),
            self.scorer.as_ref(),
        )
        .evaluate(&self.compiled.query);
        drop(reader);

        let model = self.compiled.model();
        let mut hits: Vec<SearchHit> = base
            .into_iter()
            .filter_map(|record| {
                scores.get(&record.pk).map(|score| SearchHit {
                    record: record.project(&self.schema, model),
                    score: *score,
                })
            })
            .collect();

        if self.compiled.ranks_by_relevance() {
            hits.sort_by(|a, b| {
                b.score
                    .total_cmp(&a.score)
                    .then_with(|| a.record.pk.cmp(&b.record.pk))
            });
        }
        Ok(hits)
    }

    fn watermark(&self) -> u64 {
        self.index.inverted().version() + self.store.version()
    }
}

// ============================================================================
// Tests
// ============================================================================
