//! Evaluation of normalized queries against an index snapshot
//!
//! Matching is restricted to a universe of primary keys (the base record
//! set intersected with indexed records) and optionally to a subset of field
//! paths. The result maps every matching primary key to its score.
//!
//! - `Term`: records with every token of the term in an allowed field;
//!   score sums `boost * field boost * scorer(term stats)` over fields
//! - `And`: intersection, scores added; empty `And` matches the universe
//! - `Or`: union, scores added; empty `Or` matches nothing
//! - `Not`: universe minus the child's matches, score 0

use crate::index::IndexReader;
use crate::scorer::{Scorer, TermStats};
use crate::tokenizer::term_tokens;
use sift_core::NormalizedQuery;
use std::collections::{BTreeMap, BTreeSet};

/// Primary key -> score
pub type ScoreMap = BTreeMap<u64, f32>;

/// Evaluates queries over one index snapshot
pub struct QueryMatcher<'a, 'r> {
    reader: &'a IndexReader<'r>,
    universe: &'a BTreeSet<u64>,
    fields: Option<&'a [String]>,
    scorer: &'a dyn Scorer,
}

impl<'a, 'r> QueryMatcher<'a, 'r> {
    /// Create a matcher
    ///
    /// `fields` restricts term matching to those paths and anything below
    /// them (`authors` also allows `authors.name`).
    pub fn new(
        reader: &'a IndexReader<'r>,
        universe: &'a BTreeSet<u64>,
        fields: Option<&'a [String]>,
        scorer: &'a dyn Scorer,
    ) -> Self {
        QueryMatcher {
            reader,
            universe,
            fields,
            scorer,
        }
    }

    /// Matching primary keys with scores
    pub fn evaluate(&self, query: &NormalizedQuery) -> ScoreMap {
        match query {
            NormalizedQuery::MatchAll => self.all(),
            NormalizedQuery::MatchNone => ScoreMap::new(),
            NormalizedQuery::Term { term, boost } => self.term(term, *boost),
            NormalizedQuery::And(children) => {
                let mut children = children.iter();
                let Some(first) = children.next() else {
                    return self.all();
                };
                children.fold(self.evaluate(first), |acc, child| {
                    if acc.is_empty() {
                        return acc;
                    }
                    intersect(acc, self.evaluate(child))
                })
            }
            NormalizedQuery::Or(children) => children
                .iter()
                .fold(ScoreMap::new(), |acc, child| union(acc, self.evaluate(child))),
            NormalizedQuery::Not(child) => {
                let excluded = self.evaluate(child);
                self.universe
                    .iter()
                    .filter(|pk| !excluded.contains_key(*pk))
                    .map(|pk| (*pk, 0.0))
                    .collect()
            }
        }
    }

    fn all(&self) -> ScoreMap {
        self.universe.iter().map(|pk| (*pk, 0.0)).collect()
    }

    fn field_allowed(&self, path: &str) -> bool {
        match self.fields {
            None => true,
            Some(fields) => fields.iter().any(|f| {
                path == f
                    || (path.len() > f.len()
                        && path.starts_with(f.as_str())
                        && path.as_bytes()[f.len()] == b'.')
            }),
        }
    }

    fn term(&self, term: &str, boost: f32) -> ScoreMap {
        let mut tokens = term_tokens(term).into_iter();
        let Some(first) = tokens.next() else {
            return ScoreMap::new();
        };
        tokens.fold(self.token(&first, boost), |acc, token| {
            intersect(acc, self.token(&token, boost))
        })
    }

    fn token(&self, token: &str, boost: f32) -> ScoreMap {
        let idf = self.reader.compute_idf(token);
        let mut scores = ScoreMap::new();
        for posting in self.reader.postings(token) {
            if !self.universe.contains(&posting.pk) {
                continue;
            }
            let Some(field) = self
                .reader
                .entry(posting.pk)
                .and_then(|e| e.fields.get(posting.field))
            else {
                continue;
            };
            if !self.field_allowed(&field.path) {
                continue;
            }
            let stats = TermStats {
                tf: posting.tf,
                field_len: posting.field_len,
                avg_field_len: self.reader.avg_field_len(&field.path),
                idf,
            };
            *scores.entry(posting.pk).or_insert(0.0) +=
                boost * field.boost * self.scorer.score(&stats);
        }
        scores
    }
}

fn intersect(a: ScoreMap, b: ScoreMap) -> ScoreMap {
    a.into_iter()
        .filter_map(|(pk, score)| b.get(&pk).map(|other| (pk, score + other)))
        .collect()
}

fn union(mut a: ScoreMap, b: ScoreMap) -> ScoreMap {
    for (pk, score) in b {
        *a.entry(pk).or_insert(0.0) += score;
    }
    a
}

// ============================================================================
// Tests
// ============================================================================
