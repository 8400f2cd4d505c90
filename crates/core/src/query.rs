//! Query algebra
//!
//! This module defines:
//! - `Query`: the immutable expression tree callers build
//! - `NormalizedQuery`: the boost-pushed form backends execute
//! - `Operator`: how `PlainText` tokens are combined
//!
//! # Building Queries
//!
//! ```
//! use sift_core::query::{Query, MATCH_ALL};
//!
//! let q = (Query::term("javascript") & !Query::term("definitive")) | Query::term("python");
//! assert!(matches!(q, Query::Or(ref children) if children.len() == 2));
//!
//! let everything = MATCH_ALL;
//! assert_eq!(everything, Query::MatchAll);
//! ```
//!
//! # Normalization
//!
//! `Boost` nodes only exist in `Query`. `Query::normalize()` multiplies every
//! enclosing boost factor into the terms below it and expands `PlainText`
//! into terms, so a `NormalizedQuery` never carries a live boost node.

use crate::error::{Error, Result};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

/// Query that matches every record
pub const MATCH_ALL: Query = Query::MatchAll;

// ============================================================================
// Operator
// ============================================================================

/// How the tokens of a `PlainText` query are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    /// Every token must match
    And,
    /// Any token may match (default)
    #[default]
    Or,
}

impl Operator {
    /// Parse an operator name, case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` for anything other than `and` / `or`.
    pub fn parse(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("and") {
            Ok(Operator::And)
        } else if s.eq_ignore_ascii_case("or") {
            Ok(Operator::Or)
        } else {
            Err(Error::invalid_value(format!(
                "operator must be 'and' or 'or', got '{}'",
                s
            )))
        }
    }

    /// Lowercase operator name
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Operator::parse(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Query
// ============================================================================

/// A single indivisible token match
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// The token to match
    pub term: String,
    /// Score multiplier
    pub boost: f32,
}

/// Whitespace-separated free text
#[derive(Debug, Clone, PartialEq)]
pub struct PlainText {
    /// The raw text
    pub text: String,
    /// How the tokens combine
    pub operator: Operator,
    /// Score multiplier applied to every token
    pub boost: f32,
}

/// Query expression tree
///
/// Children keep construction order. Two trees built in a different order
/// are not required to compare equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every record
    MatchAll,
    /// Single token
    Term(Term),
    /// Free text split into terms
    PlainText(PlainText),
    /// All children must match; empty means match-all
    And(Vec<Query>),
    /// Any child may match; empty means match-none
    Or(Vec<Query>),
    /// Child must not match
    Not(Box<Query>),
    /// Multiplies the boost of every term below by the factor
    Boost(Box<Query>, f32),
}

impl Query {
    /// Term with the default boost of 1.0
    pub fn term(term: impl Into<String>) -> Query {
        Query::term_with_boost(term, 1.0)
    }

    /// Term with an explicit boost
    pub fn term_with_boost(term: impl Into<String>, boost: f32) -> Query {
        Query::Term(Term {
            term: term.into(),
            boost,
        })
    }

    /// Free text with an operator given by name (`"and"` / `"or"`, any case)
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` if the operator is not recognised.
    pub fn plain_text(text: impl Into<String>, operator: &str) -> Result<Query> {
        Ok(Query::plain_text_with(text, Operator::parse(operator)?))
    }

    /// Free text with an already parsed operator
    pub fn plain_text_with(text: impl Into<String>, operator: Operator) -> Query {
        Query::PlainText(PlainText {
            text: text.into(),
            operator,
            boost: 1.0,
        })
    }

    /// Conjunction of the given children, kept as given
    pub fn and(children: impl IntoIterator<Item = Query>) -> Query {
        Query::And(children.into_iter().collect())
    }

    /// Disjunction of the given children, kept as given
    pub fn or(children: impl IntoIterator<Item = Query>) -> Query {
        Query::Or(children.into_iter().collect())
    }

    /// Negation
    pub fn not(child: Query) -> Query {
        Query::Not(Box::new(child))
    }

    /// Boost every term of `child` by `factor`
    pub fn boost(child: Query, factor: f32) -> Query {
        Query::Boost(Box::new(child), factor)
    }

    /// Require `include` and reject `exclude` without affecting the score
    ///
    /// Rewrites to nested `And` / `Boost(_, 0)` / `Not` nodes:
    ///
    /// - include only: `And([query, Boost(include, 0)])`
    /// - exclude only: `And([query, Boost(Not(exclude), 0)])`
    /// - both: `And([And([query, Boost(include, 0)]), Boost(Not(exclude), 0)])`
    /// - neither: `query`
    pub fn filter(query: Query, include: Option<Query>, exclude: Option<Query>) -> Query {
        let mut filtered = query;
        if let Some(include) = include {
            filtered = Query::And(vec![filtered, Query::boost(include, 0.0)]);
        }
        if let Some(exclude) = exclude {
            filtered = Query::And(vec![filtered, Query::boost(Query::not(exclude), 0.0)]);
        }
        filtered
    }

    /// Direct children of this node
    pub fn children(&self) -> &[Query] {
        match self {
            Query::And(children) | Query::Or(children) => children,
            Query::Not(child) | Query::Boost(child, _) => std::slice::from_ref(child.as_ref()),
            Query::MatchAll | Query::Term(_) | Query::PlainText(_) => &[],
        }
    }

    /// Push every boost down to the terms and expand free text
    pub fn normalize(&self) -> NormalizedQuery {
        self.normalize_with(1.0)
    }

    fn normalize_with(&self, factor: f32) -> NormalizedQuery {
        match self {
            Query::MatchAll => NormalizedQuery::MatchAll,
            Query::Term(t) => NormalizedQuery::Term {
                term: t.term.clone(),
                boost: t.boost * factor,
            },
            Query::PlainText(p) => {
                let boost = p.boost * factor;
                let terms: Vec<NormalizedQuery> = p
                    .text
                    .split_whitespace()
                    .map(|token| NormalizedQuery::Term {
                        term: token.to_string(),
                        boost,
                    })
                    .collect();
                if terms.is_empty() {
                    return NormalizedQuery::MatchNone;
                }
                match p.operator {
                    Operator::And => NormalizedQuery::And(terms),
                    Operator::Or => NormalizedQuery::Or(terms),
                }
            }
            Query::And(children) => {
                NormalizedQuery::And(children.iter().map(|c| c.normalize_with(factor)).collect())
            }
            Query::Or(children) => {
                NormalizedQuery::Or(children.iter().map(|c| c.normalize_with(factor)).collect())
            }
            Query::Not(child) => NormalizedQuery::Not(Box::new(child.normalize_with(factor))),
            Query::Boost(child, f) => child.normalize_with(factor * f),
        }
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        let mut children = match self {
            Query::And(children) => children,
            other => vec![other],
        };
        match rhs {
            Query::And(more) => children.extend(more),
            other => children.push(other),
        }
        Query::And(children)
    }
}

impl BitOr for Query {
    type Output = Query;

    fn bitor(self, rhs: Query) -> Query {
        let mut children = match self {
            Query::Or(children) => children,
            other => vec![other],
        };
        match rhs {
            Query::Or(more) => children.extend(more),
            other => children.push(other),
        }
        Query::Or(children)
    }
}

impl Not for Query {
    type Output = Query;

    fn not(self) -> Query {
        Query::not(self)
    }
}

// ============================================================================
// NormalizedQuery
// ============================================================================

/// Query tree after boost pushdown
///
/// Produced only by `Query::normalize()`. Backends execute this form.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedQuery {
    /// Matches every record
    MatchAll,
    /// Matches no record (blank free text)
    MatchNone,
    /// Single token with its effective boost
    Term {
        /// The token to match
        term: String,
        /// Product of the term's own boost and every enclosing factor
        boost: f32,
    },
    /// All children must match
    And(Vec<NormalizedQuery>),
    /// Any child may match
    Or(Vec<NormalizedQuery>),
    /// Child must not match
    Not(Box<NormalizedQuery>),
}

impl NormalizedQuery {
    /// Visit every term with its effective boost, depth first
    pub fn for_each_term<F: FnMut(&str, f32)>(&self, f: &mut F) {
        match self {
            NormalizedQuery::Term { term, boost } => f(term, *boost),
            NormalizedQuery::And(children) | NormalizedQuery::Or(children) => {
                for child in children {
                    child.for_each_term(f);
                }
            }
            NormalizedQuery::Not(child) => child.for_each_term(f),
            NormalizedQuery::MatchAll | NormalizedQuery::MatchNone => {}
        }
    }

    /// Check every term boost is finite and non-negative
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidValue` naming the first offending term.
    pub fn validate_boosts(&self) -> Result<()> {
        let mut bad: Option<(String, f32)> = None;
        self.for_each_term(&mut |term, boost| {
            if bad.is_none() && !(boost.is_finite() && boost >= 0.0) {
                bad = Some((term.to_string(), boost));
            }
        });
        match bad {
            Some((term, boost)) => Err(Error::invalid_value(format!(
                "boost for term '{}' must be a non-negative number, got {}",
                term, boost
            ))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
