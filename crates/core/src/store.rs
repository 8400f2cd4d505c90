//! Record storage
//!
//! `RecordStore` is the seam between the search engine and wherever records
//! actually live. Backends read records through it to build documents and
//! evaluate base record sets. `MemoryStore` is the in-process implementation.

use crate::error::Result;
use crate::record::Record;
use crate::schema::Schema;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Source of records
///
/// Implementations must be `Send + Sync` so backends can share them.
pub trait RecordStore: Send + Sync {
    /// Schema the records conform to
    fn schema(&self) -> &Arc<Schema>;

    /// All instances of `model`, including instances of its subtypes,
    /// ordered by primary key
    fn records(&self, model: &str) -> Result<Vec<Record>>;

    /// A single instance of `model` (or a subtype) by primary key
    fn get(&self, model: &str, pk: u64) -> Result<Option<Record>>;

    /// Monotonic counter bumped on every write
    fn version(&self) -> u64;
}

/// In-memory record store
///
/// Records are keyed by `(root type, pk)`, so a primary key is unique across
/// a type hierarchy.
#[derive(Debug)]
pub struct MemoryStore {
    schema: Arc<Schema>,
    records: RwLock<BTreeMap<(String, u64), Record>>,
    version: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store over a schema
    pub fn new(schema: Arc<Schema>) -> Self {
        MemoryStore {
            schema,
            records: RwLock::new(BTreeMap::new()),
            version: AtomicU64::new(0),
        }
    }

    /// Insert or replace a record
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownModel` if the record's type is undeclared.
    pub fn insert(&self, record: Record) -> Result<()> {
        let root = self.schema.root_of(&record.model)?.to_string();
        debug!(model = %record.model, pk = record.pk, "store insert");
        self.records.write().insert((root, record.pk), record);
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Remove a record, returning it if present
    pub fn delete(&self, model: &str, pk: u64) -> Result<Option<Record>> {
        let root = self.schema.root_of(model)?.to_string();
        let removed = self.records.write().remove(&(root, pk));
        if removed.is_some() {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        Ok(removed)
    }

    /// Total number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn records(&self, model: &str) -> Result<Vec<Record>> {
        let root = self.schema.root_of(model)?;
        let records = self.records.read();
        Ok(records
            .range((root.to_string(), 0)..=(root.to_string(), u64::MAX))
            .map(|(_, r)| r)
            .filter(|r| self.schema.is_subtype(&r.model, model))
            .cloned()
            .collect())
    }

    fn get(&self, model: &str, pk: u64) -> Result<Option<Record>> {
        let root = self.schema.root_of(model)?;
        let records = self.records.read();
        Ok(records
            .get(&(root.to_string(), pk))
            .filter(|r| self.schema.is_subtype(&r.model, model))
            .cloned())
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }

    fn records(&self, model: &str) -> Result<Vec<Record>> {
        (**self).records(model)
    }

    fn get(&self, model: &str, pk: u64) -> Result<Option<Record>> {
        (**self).get(model, pk)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }
}
