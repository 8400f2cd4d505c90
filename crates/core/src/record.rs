//! Records: the things that get indexed and searched

use crate::schema::Schema;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored record of some declared type
///
/// Scalar field values live in `values`; relations hold the primary keys
/// of related records (of the relation's declared type or its subtypes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Concrete type of the record
    pub model: String,
    /// Primary key, unique within the record's root type
    pub pk: u64,
    /// Scalar field values
    pub values: BTreeMap<String, Value>,
    /// Relation field -> related primary keys
    pub relations: BTreeMap<String, Vec<u64>>,
}

impl Record {
    /// Create a record with no field values
    pub fn new(model: impl Into<String>, pk: u64) -> Self {
        Record {
            model: model.into(),
            pk,
            values: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Builder: set a field value
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    /// Builder: set a relation
    pub fn with_related(
        mut self,
        field: impl Into<String>,
        pks: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.relations
            .insert(field.into(), pks.into_iter().collect());
        self
    }

    /// Field value, if set
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Related primary keys (empty if the relation is unset)
    pub fn related(&self, field: &str) -> &[u64] {
        self.relations.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// View this record as an instance of `model`
    ///
    /// Keeps only the values and relations of fields visible on `model`, and
    /// relabels the record. A subtype record projected onto its supertype
    /// loses the subtype's own fields.
    pub fn project(&self, schema: &Schema, model: &str) -> Record {
        if self.model == model {
            return self.clone();
        }
        let visible = |name: &str| schema.field(model, name).is_some();
        Record {
            model: model.to_string(),
            pk: self.pk,
            values: self
                .values
                .iter()
                .filter(|(k, _)| visible(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            relations: self
                .relations
                .iter()
                .filter(|(k, _)| visible(k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
