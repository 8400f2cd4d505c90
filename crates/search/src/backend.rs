//! Backend and index contracts
//!
//! Every search backend implements `SearchBackend`, and hands out one
//! `SearchIndex` per indexed root record type. `compile_search` holds the
//! validation shared by all backends, so they fail the same way on the same
//! input:
//!
//! 1. unknown model: `Error::UnknownModel`
//! 2. model without search configuration, or blank text: empty results
//! 3. bad operator: `Error::InvalidValue`
//! 4. bad filter, ordering or search field: `Error::Field`
//! 5. negative or non-finite boost: `Error::InvalidValue`

use crate::results::SearchResults;
use sift_core::{
    FieldPurpose, NormalizedQuery, Operator, Query, Record, RecordSet, Result, Schema,
};
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Search arguments
// ============================================================================

/// What to search for: free text or a query tree
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Free text, wrapped as `PlainText` with the search operator
    Text(String),
    /// A query tree
    Query(Query),
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        SearchQuery::Text(text.to_string())
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        SearchQuery::Text(text)
    }
}

impl From<Query> for SearchQuery {
    fn from(query: Query) -> Self {
        SearchQuery::Query(query)
    }
}

/// Options of a search call
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Restrict text matching to these fields
    pub fields: Option<Vec<String>>,
    /// How free text tokens combine: `and` / `or`, any case
    pub operator: String,
    /// Rank by relevance when the record set has no explicit ordering
    pub order_by_relevance: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            fields: None,
            operator: Operator::default().as_str().to_string(),
            order_by_relevance: true,
        }
    }
}

impl SearchOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: restrict the searched fields
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: set the free text operator
    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    /// Builder: enable or disable relevance ordering
    pub fn order_by_relevance(mut self, enabled: bool) -> Self {
        self.order_by_relevance = enabled;
        self
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Index of one root record type within a backend
///
/// Writes are buffered until `refresh`.
pub trait SearchIndex: Send + Sync {
    /// Root record type this index holds
    fn model(&self) -> &str;

    /// Add or replace a record
    ///
    /// A record whose type has no searchable fields is ignored.
    fn add_item(&self, record: &Record) -> Result<()>;

    /// Add or replace several records
    fn add_items(&self, records: &[Record]) -> Result<()> {
        for record in records {
            self.add_item(record)?;
        }
        Ok(())
    }

    /// Remove a record; no-op if absent
    fn delete_item(&self, record: &Record) -> Result<()>;

    /// Publish buffered writes to searches
    fn refresh(&self) -> Result<()>;

    /// Drop all entries and buffered writes
    fn reset(&self) -> Result<()>;

    /// Number of searchable (refreshed) entries
    fn len(&self) -> usize;

    /// Check if no entries are searchable
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A search backend
pub trait SearchBackend: Send + Sync {
    /// Class path the backend was constructed from
    fn name(&self) -> &str;

    /// Schema of the indexed records
    fn schema(&self) -> &Arc<Schema>;

    /// Search `records` for `query`
    ///
    /// Validation errors are returned here; evaluation happens when the
    /// results are consumed.
    fn search(
        &self,
        query: SearchQuery,
        records: &RecordSet,
        options: &SearchOptions,
    ) -> Result<SearchResults>;

    /// Index responsible for `model`, `None` if the type is not indexed
    fn get_index_for_model(&self, model: &str) -> Result<Option<Arc<dyn SearchIndex>>>;

    /// Create (or fetch) the index responsible for `model`
    fn add_model(&self, model: &str) -> Result<Arc<dyn SearchIndex>>;

    /// Drop every index
    fn reset_index(&self) -> Result<()>;

    /// Refresh every index
    fn refresh_index(&self) -> Result<()>;

    /// Index one record and refresh
    fn add(&self, record: &Record) -> Result<()> {
        if let Some(index) = self.get_index_for_model(&record.model)? {
            index.add_item(record)?;
            index.refresh()?;
        }
        Ok(())
    }

    /// Index several records of one type and refresh
    fn add_bulk(&self, model: &str, records: &[Record]) -> Result<()> {
        if let Some(index) = self.get_index_for_model(model)? {
            index.add_items(records)?;
            index.refresh()?;
        }
        Ok(())
    }

    /// Remove one record and refresh
    fn delete(&self, record: &Record) -> Result<()> {
        if let Some(index) = self.get_index_for_model(&record.model)? {
            index.delete_item(record)?;
            index.refresh()?;
        }
        Ok(())
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// A validated search, ready for a backend to evaluate
#[derive(Debug, Clone)]
pub struct CompiledSearch {
    /// Base record set
    pub records: RecordSet,
    /// Query with boosts pushed down
    pub query: NormalizedQuery,
    /// Field restriction, if any
    pub fields: Option<Vec<String>>,
    /// Whether to rank by score
    pub order_by_relevance: bool,
}

impl CompiledSearch {
    /// Searched record type
    pub fn model(&self) -> &str {
        self.records.model()
    }

    /// Check if results are ranked by score
    ///
    /// An explicit ordering on the record set always wins.
    pub fn ranks_by_relevance(&self) -> bool {
        self.order_by_relevance && !self.records.is_ordered()
    }
}

/// Validate a search request
///
/// Returns `None` when the search yields nothing by definition (blank text,
/// or a type without search configuration).
pub fn compile_search(
    schema: &Schema,
    query: SearchQuery,
    records: &RecordSet,
    options: &SearchOptions,
) -> Result<Option<CompiledSearch>> {
    let model = records.model();
    schema.model(model)?;
    if !schema.has_indexed_family(model) {
        debug!(model, "model has no search configuration, returning empty results");
        return Ok(None);
    }

    if let SearchQuery::Text(text) = &query {
        if text.trim().is_empty() {
            debug!(model, "blank query, returning empty results");
            return Ok(None);
        }
    }
    let operator = Operator::parse(&options.operator)?;

    let query = match query {
        SearchQuery::Text(text) => Query::plain_text_with(text, operator),
        SearchQuery::Query(query) => query,
    };

    records.validate(schema)?;
    if let Some(fields) = &options.fields {
        schema.resolve(model, fields, FieldPurpose::Search)?;
    }

    let normalized = query.normalize();
    normalized.validate_boosts()?;

    if records.is_ordered() && options.order_by_relevance {
        debug!(model, "record set is ordered, ignoring relevance ordering");
    }

    Ok(Some(CompiledSearch {
        records: records.clone(),
        query: normalized,
        fields: options.fields.clone(),
        order_by_relevance: options.order_by_relevance,
    }))
}

// ============================================================================
// Tests
// ============================================================================
