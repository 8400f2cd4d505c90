//! Lazy search result views
//!
//! `SearchResults` is returned by every backend search. It holds a
//! `ResultSource` and evaluates it only when consumed (`count`, `get`,
//! `slice`, `to_vec`, ...). The evaluation is cached together with the
//! source's watermark, and redone when the watermark moves, so a view stays
//! consistent with the index and store across writes.
//!
//! Ordering is fixed by the source. Sources must break ties
//! deterministically so disjoint slices partition the full match set.

use parking_lot::Mutex;
use sift_core::{Record, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;
use tracing::debug;

/// One ranked result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The record, typed as the searched model
    pub record: Record,
    /// Relevance score (0 when the query contributes no score)
    pub score: f32,
}

/// Backend-provided evaluation of a compiled search
pub trait ResultSource: Send + Sync {
    /// Evaluate the search in final order
    fn fetch(&self) -> Result<Vec<SearchHit>>;

    /// Changes whenever a re-evaluation could give a different answer
    fn watermark(&self) -> u64;
}

type Cached = Option<(u64, Arc<Vec<SearchHit>>)>;

/// Lazy, sliceable, countable view over search hits
pub struct SearchResults {
    source: Option<Arc<dyn ResultSource>>,
    cache: Mutex<Cached>,
}

impl SearchResults {
    /// Results over a source
    pub fn new(source: Arc<dyn ResultSource>) -> Self {
        SearchResults {
            source: Some(source),
            cache: Mutex::new(None),
        }
    }

    /// Results that never contain anything
    pub fn empty() -> Self {
        SearchResults {
            source: None,
            cache: Mutex::new(None),
        }
    }

    fn hits_arc(&self) -> Result<Arc<Vec<SearchHit>>> {
        let Some(source) = &self.source else {
            return Ok(Arc::new(Vec::new()));
        };
        let watermark = source.watermark();
        let mut cache = self.cache.lock();
        if let Some((seen, hits)) = cache.as_ref() {
            if *seen == watermark {
                return Ok(Arc::clone(hits));
            }
        }
        let hits = Arc::new(source.fetch()?);
        debug!(count = hits.len(), watermark, "materialised search results");
        *cache = Some((watermark, Arc::clone(&hits)));
        Ok(hits)
    }

    /// Number of matching records, ignoring any slicing
    pub fn count(&self) -> Result<usize> {
        Ok(self.hits_arc()?.len())
    }

    /// Alias for `count`
    pub fn len(&self) -> Result<usize> {
        self.count()
    }

    /// Check if nothing matches
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    /// Record at a position
    pub fn get(&self, index: usize) -> Result<Option<Record>> {
        Ok(self.hits_arc()?.get(index).map(|h| h.record.clone()))
    }

    /// Records in a position range, in order
    ///
    /// Out-of-range bounds are clamped.
    pub fn slice<R: RangeBounds<usize>>(&self, range: R) -> Result<Vec<Record>> {
        Ok(self.slice_hits(range)?.into_iter().map(|h| h.record).collect())
    }

    /// Hits in a position range, in order
    pub fn slice_hits<R: RangeBounds<usize>>(&self, range: R) -> Result<Vec<SearchHit>> {
        let hits = self.hits_arc()?;
        let len = hits.len();
        let start = match range.start_bound() {
            Bound::Included(s) => *s,
            Bound::Excluded(s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(e) => e.saturating_add(1),
            Bound::Excluded(e) => *e,
            Bound::Unbounded => len,
        }
        .min(len);
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(hits[start..end].to_vec())
    }

    /// All hits with scores, in order
    pub fn hits(&self) -> Result<Vec<SearchHit>> {
        Ok(self.hits_arc()?.as_ref().clone())
    }

    /// All records, in order
    pub fn to_vec(&self) -> Result<Vec<Record>> {
        self.slice(..)
    }

    /// Iterate over all records, in order
    pub fn iter(&self) -> Result<std::vec::IntoIter<Record>> {
        Ok(self.to_vec()?.into_iter())
    }

    /// Primary keys of all matches, for order-free comparison
    pub fn keys(&self) -> Result<BTreeSet<u64>> {
        Ok(self.hits_arc()?.iter().map(|h| h.record.pk).collect())
    }
}

impl Clone for SearchResults {
    fn clone(&self) -> Self {
        SearchResults {
            source: self.source.clone(),
            cache: Mutex::new(None),
        }
    }
}

impl fmt::Debug for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResults")
            .field("empty", &self.source.is_none())
            .field("cached", &self.cache.lock().is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
