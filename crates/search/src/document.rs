//! Derivation of index entries from records
//!
//! Each searchable field of the record's concrete type contributes one
//! `FieldContent`:
//! - stored and computed fields are rendered to text and tokenized
//! - searchable relations are followed through the record store, and the
//!   related records' searchable fields are indexed under `relation.field`
//!   with the product of both boosts
//!
//! Relations are followed at most `MAX_RELATION_DEPTH` hops deep.

use crate::index::{FieldContent, IndexEntry};
use crate::tokenizer::tokenize_value;
use sift_core::{Record, RecordStore, Result, Schema};
use std::collections::BTreeMap;

/// Maximum number of relation hops followed when indexing
pub const MAX_RELATION_DEPTH: usize = 2;

/// Build the index entry for a record
///
/// Returns `None` if the record's type has no searchable fields.
pub fn build_entry(
    schema: &Schema,
    store: &dyn RecordStore,
    record: &Record,
) -> Result<Option<IndexEntry>> {
    if schema.searchable_fields(&record.model)?.is_empty() {
        return Ok(None);
    }

    let mut fields = Vec::new();
    collect(schema, store, &record.model, record, "", 1.0, 0, &mut fields)?;

    let filter_values = schema
        .fields(&record.model)?
        .iter()
        .filter(|f| f.is_filterable() && !f.is_relation())
        .map(|f| (f.name().to_string(), f.value_of(record)))
        .collect::<BTreeMap<_, _>>();

    Ok(Some(IndexEntry {
        pk: record.pk,
        model: record.model.clone(),
        fields,
        filter_values,
    }))
}

#[allow(clippy::too_many_arguments)]
fn collect(
    schema: &Schema,
    store: &dyn RecordStore,
    model: &str,
    record: &Record,
    prefix: &str,
    boost: f32,
    depth: usize,
    out: &mut Vec<FieldContent>,
) -> Result<()> {
    for field in schema.searchable_fields(model)? {
        let path = if prefix.is_empty() {
            field.name().to_string()
        } else {
            format!("{}.{}", prefix, field.name())
        };
        let boost = boost * field.field_boost();

        match field.related_model() {
            Some(related_model) => {
                if depth >= MAX_RELATION_DEPTH {
                    continue;
                }
                for pk in record.related(field.name()) {
                    // dangling keys contribute nothing
                    if let Some(related) = store.get(related_model, *pk)? {
                        collect(schema, store, related_model, &related, &path, boost, depth + 1, out)?;
                    }
                }
            }
            None => push(out, path, boost, tokenize_value(&field.value_of(record))),
        }
    }
    Ok(())
}

fn push(out: &mut Vec<FieldContent>, path: String, boost: f32, tokens: Vec<String>) {
    if tokens.is_empty() {
        return;
    }
    match out.iter_mut().find(|f| f.path == path) {
        Some(existing) => existing.tokens.extend(tokens),
        None => out.push(FieldContent { path, boost, tokens }),
    }
}
