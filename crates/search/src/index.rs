//! Inverted index over derived record documents
//!
//! This module provides:
//! - IndexEntry: the tokenized, per-field document derived from one record
//! - InvertedIndex with posting lists and per-field length statistics
//! - Version watermark for result cache invalidation
//!
//! # Atomicity
//!
//! All state lives behind one `RwLock`. Replacing a record's entry removes
//! the old postings and inserts the new ones under a single write guard, so
//! a reader never sees a record's old and new content at the same time.
//! Queries evaluate against one `IndexReader` for a consistent snapshot.

use parking_lot::{RwLock, RwLockReadGuard};
use sift_core::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// IndexEntry
// ============================================================================

/// Tokens of one searchable field (or related field path) of a record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldContent {
    /// Field path, `name` or `relation.name`
    pub path: String,
    /// Effective boost for matches in this field
    pub boost: f32,
    /// Tokens in field order
    pub tokens: Vec<String>,
}

/// The document derived from one record
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Primary key
    pub pk: u64,
    /// Concrete record type
    pub model: String,
    /// Searchable content, one item per field path
    pub fields: Vec<FieldContent>,
    /// Filterable field values at indexing time
    pub filter_values: BTreeMap<String, Value>,
}

impl IndexEntry {
    /// Total token count across all fields
    pub fn token_count(&self) -> usize {
        self.fields.iter().map(|f| f.tokens.len()).sum()
    }

    /// Stored value of a filterable field
    pub fn filter_value(&self, field: &str) -> Option<&Value> {
        self.filter_values.get(field)
    }
}

// ============================================================================
// PostingEntry
// ============================================================================

/// Occurrence of a term in one field of one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostingEntry {
    /// Record primary key
    pub pk: u64,
    /// Position of the field in `IndexEntry::fields`
    pub field: usize,
    /// Term frequency in the field
    pub tf: u32,
    /// Field length in tokens
    pub field_len: u32,
}

// ============================================================================
// InvertedIndex
// ============================================================================

#[derive(Debug, Default)]
struct IndexState {
    entries: BTreeMap<u64, IndexEntry>,
    postings: HashMap<String, Vec<PostingEntry>>,
    /// Term -> number of records containing it in any field
    doc_freqs: HashMap<String, usize>,
    /// Field path -> (sum of lengths, number of records with the field)
    field_lengths: HashMap<String, (usize, usize)>,
}

impl IndexState {
    fn insert(&mut self, entry: IndexEntry) {
        let mut seen_terms: HashSet<&str> = HashSet::new();
        for (field_idx, field) in entry.fields.iter().enumerate() {
            let field_len = field.tokens.len() as u32;
            let mut tf_map: HashMap<&str, u32> = HashMap::new();
            for token in &field.tokens {
                *tf_map.entry(token.as_str()).or_insert(0) += 1;
            }
            for (term, tf) in tf_map {
                self.postings
                    .entry(term.to_string())
                    .or_default()
                    .push(PostingEntry {
                        pk: entry.pk,
                        field: field_idx,
                        tf,
                        field_len,
                    });
                if seen_terms.insert(term) {
                    *self.doc_freqs.entry(term.to_string()).or_insert(0) += 1;
                }
            }
            let stats = self.field_lengths.entry(field.path.clone()).or_insert((0, 0));
            stats.0 += field.tokens.len();
            stats.1 += 1;
        }
        self.entries.insert(entry.pk, entry);
    }

    fn remove(&mut self, pk: u64) -> bool {
        let Some(old) = self.entries.remove(&pk) else {
            return false;
        };
        let mut terms: HashSet<&str> = HashSet::new();
        for field in &old.fields {
            terms.extend(field.tokens.iter().map(String::as_str));
            if let Some(stats) = self.field_lengths.get_mut(&field.path) {
                stats.0 = stats.0.saturating_sub(field.tokens.len());
                stats.1 = stats.1.saturating_sub(1);
                if stats.1 == 0 {
                    self.field_lengths.remove(&field.path);
                }
            }
        }
        for term in terms {
            if let Some(list) = self.postings.get_mut(term) {
                list.retain(|p| p.pk != pk);
                if list.is_empty() {
                    self.postings.remove(term);
                }
            }
            if let Some(df) = self.doc_freqs.get_mut(term) {
                *df = df.saturating_sub(1);
                if *df == 0 {
                    self.doc_freqs.remove(term);
                }
            }
        }
        true
    }
}

/// Inverted index for one root record type
///
/// # Version Watermark
///
/// Incremented on every mutation. Result views compare it to decide whether
/// a cached evaluation is still current.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    state: RwLock<IndexState>,
    version: AtomicU64,
}

impl InvertedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current version
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Insert or replace a record's entry
    pub fn index_entry(&self, entry: IndexEntry) {
        let mut state = self.state.write();
        state.remove(entry.pk);
        state.insert(entry);
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Remove a record's entry
    ///
    /// Returns false (and leaves the version alone) if it was not indexed.
    pub fn remove_entry(&self, pk: u64) -> bool {
        let removed = self.state.write().remove(pk);
        if removed {
            self.version.fetch_add(1, Ordering::Release);
        }
        removed
    }

    /// Drop every entry
    pub fn clear(&self) {
        *self.state.write() = IndexState::default();
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Number of indexed records
    pub fn total_docs(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if a record is indexed
    pub fn contains(&self, pk: u64) -> bool {
        self.state.read().entries.contains_key(&pk)
    }

    /// Copy of a record's entry
    pub fn entry(&self, pk: u64) -> Option<IndexEntry> {
        self.state.read().entries.get(&pk).cloned()
    }

    /// Consistent read view for query evaluation
    pub fn reader(&self) -> IndexReader<'_> {
        IndexReader {
            state: self.state.read(),
        }
    }
}

/// Read guard over an `InvertedIndex`
///
/// Holds the read lock; writers block until it is dropped.
pub struct IndexReader<'a> {
    state: RwLockReadGuard<'a, IndexState>,
}

impl IndexReader<'_> {
    /// Number of indexed records
    pub fn total_docs(&self) -> usize {
        self.state.entries.len()
    }

    /// Check if a record is indexed
    pub fn contains(&self, pk: u64) -> bool {
        self.state.entries.contains_key(&pk)
    }

    /// Indexed entry by primary key
    pub fn entry(&self, pk: u64) -> Option<&IndexEntry> {
        self.state.entries.get(&pk)
    }

    /// Postings for a term (empty if absent)
    pub fn postings(&self, term: &str) -> &[PostingEntry] {
        self.state
            .postings
            .get(term)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get document frequency for a term
    pub fn doc_freq(&self, term: &str) -> usize {
        self.state.doc_freqs.get(term).copied().unwrap_or(0)
    }

    /// Compute IDF for a term
    ///
    /// Uses standard IDF formula with smoothing:
    /// IDF(t) = ln((N - df + 0.5) / (df + 0.5) + 1)
    pub fn compute_idf(&self, term: &str) -> f32 {
        let n = self.total_docs() as f32;
        let df = self.doc_freq(term) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Average length of a field path across records that have it
    pub fn avg_field_len(&self, path: &str) -> f32 {
        match self.state.field_lengths.get(path) {
            Some((total, count)) if *count > 0 => *total as f32 / *count as f32,
            _ => 0.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
