//! Base record sets
//!
//! A `RecordSet` names a record type plus an optional predicate and ordering.
//! It is a description only: nothing is read until `evaluate` is called,
//! which also resolves `in` subqueries.
//!
//! Predicate fields may be dotted relation paths (`authors.date_of_birth`).
//! A path that fans out through a relation matches when any reached value
//! matches. The pseudo-field `pk` is always filterable and orderable.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::{FieldPurpose, ResolvedField, Schema};
use crate::store::RecordStore;
use crate::value::Value;
use std::cmp::Ordering;
use std::ops::{BitAnd, BitOr};

/// Name of the primary key pseudo-field
pub const PK_FIELD: &str = "pk";

// ============================================================================
// Lookups and predicates
// ============================================================================

/// Source of values for an `in` lookup
#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    /// Literal values
    Values(Vec<Value>),
    /// Values of `field` across another record set, read at evaluation
    Subquery {
        /// The inner record set
        records: Box<RecordSet>,
        /// Field whose values are collected
        field: String,
    },
}

/// Comparison applied to a field's value
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Equal to
    Exact(Value),
    /// Less than
    Lt(Value),
    /// Less than or equal to
    Lte(Value),
    /// Greater than
    Gt(Value),
    /// Greater than or equal to
    Gte(Value),
    /// Equal to any of
    In(InValues),
    /// Null (`true`) or not null (`false`)
    IsNull(bool),
    /// String value starts with prefix
    StartsWith(String),
}

impl Lookup {
    /// `field = value`
    pub fn exact(value: impl Into<Value>) -> Self {
        Lookup::Exact(value.into())
    }

    /// `field < value`
    pub fn lt(value: impl Into<Value>) -> Self {
        Lookup::Lt(value.into())
    }

    /// `field <= value`
    pub fn lte(value: impl Into<Value>) -> Self {
        Lookup::Lte(value.into())
    }

    /// `field > value`
    pub fn gt(value: impl Into<Value>) -> Self {
        Lookup::Gt(value.into())
    }

    /// `field >= value`
    pub fn gte(value: impl Into<Value>) -> Self {
        Lookup::Gte(value.into())
    }

    /// `field in values`
    ///
    /// Accepts any iterator, including a one-shot one; it is consumed here.
    pub fn is_in<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Lookup::In(InValues::Values(values.into_iter().map(Into::into).collect()))
    }

    /// `field in (subquery)`
    pub fn in_subquery(values: InValues) -> Self {
        Lookup::In(values)
    }

    /// `field is null` / `field is not null`
    pub fn is_null(is_null: bool) -> Self {
        Lookup::IsNull(is_null)
    }

    /// `field starts with prefix`
    pub fn starts_with(prefix: impl Into<String>) -> Self {
        Lookup::StartsWith(prefix.into())
    }
}

/// Boolean combination of field lookups
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A single lookup
    Field {
        /// Field path
        field: String,
        /// Comparison
        lookup: Lookup,
    },
    /// Both hold
    And(Box<Predicate>, Box<Predicate>),
    /// Either holds
    Or(Box<Predicate>, Box<Predicate>),
    /// Does not hold
    Not(Box<Predicate>),
}

/// One ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field path
    pub field: String,
    /// Sort descending
    pub descending: bool,
}

impl OrderBy {
    /// Parse `field` or `-field`
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix('-') {
            Some(field) => OrderBy {
                field: field.to_string(),
                descending: true,
            },
            None => OrderBy {
                field: spec.to_string(),
                descending: false,
            },
        }
    }
}

// ============================================================================
// RecordSet
// ============================================================================

/// A lazily evaluated set of records of one type (and its subtypes)
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    model: String,
    predicate: Option<Predicate>,
    ordering: Vec<OrderBy>,
    /// First other type this set was combined with; rejected by `validate`
    foreign: Option<String>,
}

impl RecordSet {
    /// Every record of `model`
    pub fn of(model: impl Into<String>) -> Self {
        RecordSet {
            model: model.into(),
            predicate: None,
            ordering: Vec::new(),
            foreign: None,
        }
    }

    /// Record type
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The predicate, if any
    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// The explicit ordering (empty if unordered)
    pub fn ordering(&self) -> &[OrderBy] {
        &self.ordering
    }

    /// Check if an explicit ordering was requested
    pub fn is_ordered(&self) -> bool {
        !self.ordering.is_empty()
    }

    fn push(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Predicate::And(Box::new(existing), Box::new(predicate)),
            None => predicate,
        });
        self
    }

    /// Keep records whose `field` satisfies `lookup`
    pub fn filter(self, field: impl Into<String>, lookup: Lookup) -> Self {
        self.push(Predicate::Field {
            field: field.into(),
            lookup,
        })
    }

    /// Drop records whose `field` satisfies `lookup`
    pub fn exclude(self, field: impl Into<String>, lookup: Lookup) -> Self {
        self.push(Predicate::Not(Box::new(Predicate::Field {
            field: field.into(),
            lookup,
        })))
    }

    fn absorb_model(&mut self, other: &RecordSet) {
        if self.foreign.is_none() {
            self.foreign = match &other.foreign {
                Some(model) => Some(model.clone()),
                None if other.model != self.model => Some(other.model.clone()),
                None => None,
            };
        }
    }

    /// Records in both sets
    ///
    /// Both sets must be of the same type; otherwise `validate` (and so
    /// `evaluate`) fails. Keeps this set's ordering.
    pub fn and(mut self, other: RecordSet) -> Self {
        self.absorb_model(&other);
        match other.predicate {
            Some(p) => self.push(p),
            None => self,
        }
    }

    /// Records in either set
    ///
    /// Same type rule as `and`. Keeps this set's ordering.
    pub fn or(mut self, other: RecordSet) -> Self {
        self.absorb_model(&other);
        self.predicate = match (self.predicate.take(), other.predicate) {
            (Some(a), Some(b)) => Some(Predicate::Or(Box::new(a), Box::new(b))),
            // one side is unfiltered
            _ => None,
        };
        self
    }

    /// Replace the ordering; each entry is `field` or `-field`
    pub fn order_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ordering = fields
            .into_iter()
            .map(|f| OrderBy::parse(f.as_ref()))
            .collect();
        self
    }

    /// Values of `field` across this set, for use as an `in` source
    pub fn values_of(self, field: impl Into<String>) -> InValues {
        InValues::Subquery {
            records: Box::new(self),
            field: field.into(),
        }
    }

    /// Check every predicate, subquery and ordering field against the schema
    ///
    /// # Errors
    ///
    /// `Error::UnknownModel` for an undeclared type; `Error::InvalidValue`
    /// if sets of different types were combined; `Error::Field` for the
    /// first field that does not resolve for filtering or ordering.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if !schema.contains(&self.model) {
            return Err(Error::UnknownModel(self.model.clone()));
        }
        if let Some(other) = &self.foreign {
            return Err(Error::invalid_value(format!(
                "cannot combine record sets of '{}' and '{}'",
                self.model, other
            )));
        }
        if let Some(predicate) = &self.predicate {
            validate_predicate(schema, &self.model, predicate)?;
        }
        for order in &self.ordering {
            if order.field != PK_FIELD {
                schema.resolve_one(&self.model, &order.field, FieldPurpose::Order)?;
            }
        }
        Ok(())
    }

    /// Read the matching records from a store, in the set's order
    ///
    /// Unordered sets come back in primary key order. Records keep their
    /// concrete type.
    pub fn evaluate(&self, store: &dyn RecordStore) -> Result<Vec<Record>> {
        let schema = store.schema().clone();
        self.validate(&schema)?;

        let compiled = match &self.predicate {
            Some(p) => Some(compile(&schema, store, &self.model, p)?),
            None => None,
        };

        let mut matched = Vec::new();
        for record in store.records(&self.model)? {
            let keep = match &compiled {
                Some(p) => p.test(store, &record)?,
                None => true,
            };
            if keep {
                matched.push(record);
            }
        }

        if self.is_ordered() {
            let keys = self
                .ordering
                .iter()
                .map(|o| field_key(&schema, &self.model, &o.field, FieldPurpose::Order))
                .collect::<Result<Vec<_>>>()?;
            let mut decorated = matched
                .into_iter()
                .map(|r| {
                    let sort_values = keys
                        .iter()
                        .map(|k| Ok(k.values(store, &r)?.into_iter().next().unwrap_or(Value::Null)))
                        .collect::<Result<Vec<Value>>>()?;
                    Ok((sort_values, r))
                })
                .collect::<Result<Vec<_>>>()?;
            decorated.sort_by(|(a, ra), (b, rb)| {
                for ((x, y), order) in a.iter().zip(b.iter()).zip(&self.ordering) {
                    let ord = x.total_cmp(y);
                    let ord = if order.descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                ra.pk.cmp(&rb.pk)
            });
            matched = decorated.into_iter().map(|(_, r)| r).collect();
        }

        Ok(matched)
    }
}

impl BitAnd for RecordSet {
    type Output = RecordSet;

    fn bitand(self, rhs: RecordSet) -> RecordSet {
        self.and(rhs)
    }
}

impl BitOr for RecordSet {
    type Output = RecordSet;

    fn bitor(self, rhs: RecordSet) -> RecordSet {
        self.or(rhs)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn validate_predicate(schema: &Schema, model: &str, predicate: &Predicate) -> Result<()> {
    match predicate {
        Predicate::Field { field, lookup } => {
            if field != PK_FIELD {
                schema.resolve_one(model, field, FieldPurpose::Filter)?;
            }
            if let Lookup::In(InValues::Subquery { records, field }) = lookup {
                records.validate(schema)?;
                if field != PK_FIELD {
                    schema.resolve_one(records.model(), field, FieldPurpose::Filter)?;
                }
            }
            Ok(())
        }
        Predicate::And(a, b) | Predicate::Or(a, b) => {
            validate_predicate(schema, model, a)?;
            validate_predicate(schema, model, b)
        }
        Predicate::Not(p) => validate_predicate(schema, model, p),
    }
}

/// How to read a field path's values off a record
enum FieldKey {
    Pk,
    Path(ResolvedField),
}

impl FieldKey {
    fn values(&self, store: &dyn RecordStore, record: &Record) -> Result<Vec<Value>> {
        let resolved = match self {
            FieldKey::Pk => return Ok(vec![pk_value(record.pk)?]),
            FieldKey::Path(resolved) => resolved,
        };

        let mut current = vec![record.clone()];
        for (_, hop) in &resolved.hops {
            let related_model = hop.related_model().unwrap_or_default();
            let mut next = Vec::new();
            for r in &current {
                for pk in r.related(hop.name()) {
                    if let Some(related) = store.get(related_model, *pk)? {
                        next.push(related);
                    }
                }
            }
            current = next;
        }

        let field = &resolved.field;
        let mut values = Vec::new();
        for r in &current {
            if field.is_relation() {
                for pk in r.related(field.name()) {
                    values.push(pk_value(*pk)?);
                }
            } else {
                values.push(field.value_of(r));
            }
        }
        Ok(values)
    }
}

/// Primary key as a comparable value
fn pk_value(pk: u64) -> Result<Value> {
    i64::try_from(pk)
        .map(Value::Int)
        .map_err(|_| Error::invalid_value(format!("primary key {} is out of range for comparison", pk)))
}

fn field_key(schema: &Schema, model: &str, field: &str, purpose: FieldPurpose) -> Result<FieldKey> {
    if field == PK_FIELD {
        return Ok(FieldKey::Pk);
    }
    Ok(FieldKey::Path(schema.resolve_one(model, field, purpose)?))
}

enum Compiled {
    Field { key: FieldKey, test: Test },
    And(Box<Compiled>, Box<Compiled>),
    Or(Box<Compiled>, Box<Compiled>),
    Not(Box<Compiled>),
}

enum Test {
    Cmp(Value, fn(Ordering) -> bool),
    In(Vec<Value>),
    IsNull(bool),
    StartsWith(String),
}

fn compile(schema: &Schema, store: &dyn RecordStore, model: &str, predicate: &Predicate) -> Result<Compiled> {
    Ok(match predicate {
        Predicate::Field { field, lookup } => {
            let key = field_key(schema, model, field, FieldPurpose::Filter)?;
            let test = match lookup {
                Lookup::Exact(v) => Test::Cmp(v.clone(), |o| o == Ordering::Equal),
                Lookup::Lt(v) => Test::Cmp(v.clone(), |o| o == Ordering::Less),
                Lookup::Lte(v) => Test::Cmp(v.clone(), |o| o != Ordering::Greater),
                Lookup::Gt(v) => Test::Cmp(v.clone(), |o| o == Ordering::Greater),
                Lookup::Gte(v) => Test::Cmp(v.clone(), |o| o != Ordering::Less),
                Lookup::In(InValues::Values(values)) => Test::In(values.clone()),
                Lookup::In(InValues::Subquery { records, field }) => {
                    let inner_key = field_key(schema, records.model(), field, FieldPurpose::Filter)?;
                    let mut values = Vec::new();
                    for r in records.evaluate(store)? {
                        values.extend(inner_key.values(store, &r)?);
                    }
                    Test::In(values)
                }
                Lookup::IsNull(b) => Test::IsNull(*b),
                Lookup::StartsWith(prefix) => Test::StartsWith(prefix.clone()),
            };
            Compiled::Field { key, test }
        }
        Predicate::And(a, b) => Compiled::And(
            Box::new(compile(schema, store, model, a)?),
            Box::new(compile(schema, store, model, b)?),
        ),
        Predicate::Or(a, b) => Compiled::Or(
            Box::new(compile(schema, store, model, a)?),
            Box::new(compile(schema, store, model, b)?),
        ),
        Predicate::Not(p) => Compiled::Not(Box::new(compile(schema, store, model, p)?)),
    })
}

impl Compiled {
    fn test(&self, store: &dyn RecordStore, record: &Record) -> Result<bool> {
        Ok(match self {
            Compiled::Field { key, test } => {
                let values = key.values(store, record)?;
                match test {
                    Test::IsNull(expect) => values.iter().all(Value::is_null) == *expect,
                    Test::Cmp(target, accept) => values.iter().any(|v| {
                        !v.is_null() && v.compare(target).map(accept).unwrap_or(false)
                    }),
                    Test::In(targets) => values
                        .iter()
                        .any(|v| !v.is_null() && targets.iter().any(|t| v.matches(t))),
                    Test::StartsWith(prefix) => values
                        .iter()
                        .any(|v| v.as_str().is_some_and(|s| s.starts_with(prefix.as_str()))),
                }
            }
            Compiled::And(a, b) => a.test(store, record)? && b.test(store, record)?,
            Compiled::Or(a, b) => a.test(store, record)? || b.test(store, record)?,
            Compiled::Not(p) => !p.test(store, record)?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
