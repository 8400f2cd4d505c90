//! Bulk index rebuilds
//!
//! `update_index` resets a backend and re-adds every record of every indexed
//! root type, in batches, then refreshes.

use crate::backend::SearchBackend;
use crate::registry::SearchBackends;
use sift_core::{Error, RecordStore, Result};
use tracing::{debug, info};

/// Outcome of rebuilding one backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexStats {
    /// Backend class path
    pub backend: String,
    /// Root record types that were indexed
    pub models: Vec<String>,
    /// Records submitted to the indexes
    pub records: usize,
    /// Batches submitted
    pub chunks: usize,
}

/// Rebuild every index of a backend from the record store
///
/// # Errors
///
/// Returns `Error::Config` for a zero chunk size and propagates store and
/// backend errors.
pub fn update_index(
    backend: &dyn SearchBackend,
    store: &dyn RecordStore,
    chunk_size: usize,
) -> Result<ReindexStats> {
    if chunk_size == 0 {
        return Err(Error::config("chunk size must be greater than 0"));
    }
    info!(backend = backend.name(), "rebuilding search index");
    backend.reset_index()?;

    let schema = backend.schema().clone();
    let mut stats = ReindexStats {
        backend: backend.name().to_string(),
        ..ReindexStats::default()
    };

    for model in schema.models() {
        if schema.model(model)?.parent().is_some() || !schema.has_indexed_family(model) {
            continue;
        }
        let index = backend.add_model(model)?;
        let records = store.records(model)?;
        for chunk in records.chunks(chunk_size) {
            index.add_items(chunk)?;
            stats.chunks += 1;
            stats.records += chunk.len();
            debug!(model, batch = chunk.len(), "indexed batch");
        }
        index.refresh()?;
        info!(model, records = records.len(), "model indexed");
        stats.models.push(model.to_string());
    }

    Ok(stats)
}

/// Rebuild one named backend, or every configured backend
pub fn update_all(backends: &SearchBackends, backend_name: Option<&str>) -> Result<Vec<ReindexStats>> {
    let chunk_size = backends.config().reindex_chunk_size;
    let store = backends.context().store.clone();

    let names: Vec<Option<&str>> = match backend_name {
        Some(name) => vec![Some(name)],
        None if backends.config().backends.is_empty() => vec![None],
        None => backends
            .config()
            .backends
            .iter()
            .map(|entry| Some(entry.name.as_str()))
            .collect(),
    };

    names
        .into_iter()
        .map(|name| update_index(backends.get(name)?.as_ref(), store.as_ref(), chunk_size))
        .collect()
}
