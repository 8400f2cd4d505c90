//! Scoring infrastructure
//!
//! This module provides:
//! - Scorer trait for pluggable per-term scoring
//! - TermStats: the statistics a scorer sees for one term occurrence
//! - BM25Scorer default implementation
//!
//! Scorers only weigh a single term in a single field. Query boosts and
//! field boosts are applied by the caller as plain multipliers, so a zero
//! boost always yields a zero contribution.

// ============================================================================
// TermStats
// ============================================================================

/// Statistics for one term occurrence in one field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermStats {
    /// Term frequency in the field
    pub tf: u32,
    /// Field length in tokens
    pub field_len: u32,
    /// Average length of this field path across the index
    pub avg_field_len: f32,
    /// Inverse document frequency of the term
    pub idf: f32,
}

// ============================================================================
// Scorer Trait
// ============================================================================

/// Pluggable scoring interface
///
/// Higher scores indicate more relevant matches. Implementations must return
/// a finite, non-negative value for finite, non-negative inputs.
///
/// # Thread Safety
///
/// Scorers must be Send + Sync; backends share one across searches.
pub trait Scorer: Send + Sync {
    /// Score one term occurrence
    fn score(&self, stats: &TermStats) -> f32;

    /// Name for debugging and logging
    fn name(&self) -> &str;
}

// ============================================================================
// BM25Scorer
// ============================================================================

/// BM25 term scorer with per-field length normalization
///
/// # BM25 Formula
///
/// score = IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * fl/avgfl))
///
/// Where:
/// - tf = term frequency in the field
/// - fl = field length
/// - avgfl = average length of that field
/// - k1 = term saturation parameter (default 1.2)
/// - b = length normalization parameter (default 0.75)
#[derive(Debug, Clone)]
pub struct BM25Scorer {
    /// k1 parameter: term frequency saturation
    k1: f32,
    /// b parameter: length normalization
    b: f32,
}

/// Default k1
pub const DEFAULT_K1: f32 = 1.2;
/// Default b
pub const DEFAULT_B: f32 = 0.75;

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
        }
    }
}

impl BM25Scorer {
    /// Create a new BM25Scorer with custom parameters
    pub fn new(k1: f32, b: f32) -> Self {
        BM25Scorer { k1, b }
    }

    /// k1 parameter
    pub fn k1(&self) -> f32 {
        self.k1
    }

    /// b parameter
    pub fn b(&self) -> f32 {
        self.b
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, stats: &TermStats) -> f32 {
        if stats.tf == 0 {
            return 0.0;
        }
        let tf = stats.tf as f32;
        let avg_len = stats.avg_field_len.max(1.0);
        let tf_component = (tf * (self.k1 + 1.0))
            / (tf + self.k1 * (1.0 - self.b + self.b * stats.field_len as f32 / avg_len));
        stats.idf * tf_component
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

// ============================================================================
// Tests
// ============================================================================
