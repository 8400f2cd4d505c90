//! Backend registry
//!
//! Backends are looked up by configured name or by path. A path is tried
//! first as a module path (`<path>::SearchBackend`) and then as a full class
//! path. Backend classes are registered in a process-wide table.
//!
//! Constructed backends are cached per (class path, options), so repeated
//! lookups return the same instance until `clear_cache`.

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::database;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use sift_core::{Error, Record, RecordStore, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options passed to a backend constructor
pub type BackendParams = BTreeMap<String, serde_json::Value>;

/// Backend constructor
pub type BackendFactory = fn(&BackendContext, &BackendParams) -> Result<Arc<dyn SearchBackend>>;

/// Name used when no backend is requested
pub const DEFAULT_BACKEND_NAME: &str = "default";

/// Path used for `default` when it is not configured
pub const DEFAULT_BACKEND_PATH: &str = database::MODULE_PATH;

/// Class name looked up below a module path
pub const BACKEND_CLASS_NAME: &str = "SearchBackend";

// =============================================================================
// Class table
// =============================================================================

/// Registered backend classes (class path -> constructor)
static BACKEND_CLASSES: Lazy<RwLock<HashMap<String, BackendFactory>>> = Lazy::new(|| {
    let mut classes: HashMap<String, BackendFactory> = HashMap::new();
    classes.insert(database::BACKEND_CLASS.to_string(), database::factory);
    classes.insert(
        format!("{}::{}", database::MODULE_PATH, BACKEND_CLASS_NAME),
        database::factory,
    );
    RwLock::new(classes)
});

/// Register a backend class under a class path
///
/// Registering `a::b::SearchBackend` also makes the module path `a::b`
/// resolvable.
pub fn register_backend_class(path: impl Into<String>, factory: BackendFactory) {
    let path = path.into();
    debug!(path = %path, "registered search backend class");
    BACKEND_CLASSES.write().insert(path, factory);
}

/// Resolve a module or class path to (class path, constructor)
fn resolve_class(path: &str) -> Option<(String, BackendFactory)> {
    let classes = BACKEND_CLASSES.read();
    let module_class = format!("{}::{}", path, BACKEND_CLASS_NAME);
    if let Some(factory) = classes.get(&module_class) {
        return Some((module_class, *factory));
    }
    classes.get(path).map(|factory| (path.to_string(), *factory))
}

// =============================================================================
// SearchBackends
// =============================================================================

/// What backends are constructed over
#[derive(Clone)]
pub struct BackendContext {
    /// Record store backends index and search
    pub store: Arc<dyn RecordStore>,
}

impl BackendContext {
    /// Context over a record store
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        BackendContext { store }
    }
}

type CacheKey = (String, String);

/// Configured backends with an instance cache
pub struct SearchBackends {
    config: SearchConfig,
    context: BackendContext,
    cache: Mutex<HashMap<CacheKey, Arc<dyn SearchBackend>>>,
}

impl SearchBackends {
    /// Create from a configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration does not validate.
    pub fn new(config: SearchConfig, context: BackendContext) -> Result<Self> {
        config.validate()?;
        Ok(SearchBackends {
            config,
            context,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// The configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The construction context
    pub fn context(&self) -> &BackendContext {
        &self.context
    }

    /// Look up a backend by configured name or path
    ///
    /// `None` means `default`. An unconfigured `default` resolves to the
    /// database backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidSearchBackend` if the name is neither
    /// configured nor a registered module or class path, and propagates
    /// constructor errors.
    pub fn get(&self, backend: Option<&str>) -> Result<Arc<dyn SearchBackend>> {
        let requested = backend.unwrap_or(DEFAULT_BACKEND_NAME);
        let (path, params) = match self.config.resolve_entry(requested) {
            Some(entry) => (entry.backend, entry.options),
            None => (requested.to_string(), BackendParams::new()),
        };

        let (class_path, factory) = resolve_class(&path).ok_or_else(|| {
            Error::invalid_backend(
                requested,
                format!("'{}' is not a configured backend, module path or class path", path),
            )
        })?;

        let options = serde_json::to_string(&params)
            .map_err(|e| Error::config(format!("Failed to encode backend options: {}", e)))?;
        let key = (class_path, options);

        if let Some(existing) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(existing));
        }

        let built = factory(&self.context, &params)?;
        info!(backend = requested, class = %key.0, "search backend constructed");
        Ok(Arc::clone(self.cache.lock().entry(key).or_insert(built)))
    }

    /// All configured backends, in configuration order
    ///
    /// With `with_auto_update`, entries that opt out of auto-update are
    /// skipped. Without any configured entry, returns the default backend.
    pub fn all(&self, with_auto_update: bool) -> Result<Vec<Arc<dyn SearchBackend>>> {
        if self.config.backends.is_empty() {
            return Ok(vec![self.get(None)?]);
        }
        self.config
            .backends
            .iter()
            .filter(|entry| !with_auto_update || entry.auto_update)
            .map(|entry| self.get(Some(entry.name.as_str())))
            .collect()
    }

    /// Drop cached instances
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Propagate a saved record to every auto-update backend
    pub fn index_saved(&self, record: &Record) -> Result<()> {
        for backend in self.all(true)? {
            if !backend.schema().contains(&record.model) {
                warn!(model = %record.model, backend = backend.name(), "skipping index update for unknown record type");
                continue;
            }
            backend.add(record)?;
        }
        Ok(())
    }

    /// Propagate a deleted record to every auto-update backend
    pub fn index_deleted(&self, record: &Record) -> Result<()> {
        for backend in self.all(true)? {
            if !backend.schema().contains(&record.model) {
                warn!(model = %record.model, backend = backend.name(), "skipping index removal for unknown record type");
                continue;
            }
            backend.delete(record)?;
        }
        Ok(())
    }
}

// =============================================================================
// Process-wide backends
// =============================================================================

/// Installed backends
static INSTALLED: Lazy<RwLock<Option<Arc<SearchBackends>>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide backends, replacing any installed before
pub fn install(config: SearchConfig, store: Arc<dyn RecordStore>) -> Result<Arc<SearchBackends>> {
    let backends = Arc::new(SearchBackends::new(config, BackendContext::new(store))?);
    *INSTALLED.write() = Some(Arc::clone(&backends));
    info!(configured = backends.config().backends.len(), "search backends installed");
    Ok(backends)
}

/// The process-wide backends
///
/// # Errors
///
/// Returns `Error::Config` if nothing was installed.
pub fn installed() -> Result<Arc<SearchBackends>> {
    INSTALLED
        .read()
        .clone()
        .ok_or_else(|| Error::config("no search backends installed"))
}

/// Look up a process-wide backend; see `SearchBackends::get`
pub fn get_search_backend(backend: Option<&str>) -> Result<Arc<dyn SearchBackend>> {
    installed()?.get(backend)
}

/// All process-wide backends; see `SearchBackends::all`
pub fn get_search_backends(with_auto_update: bool) -> Result<Vec<Arc<dyn SearchBackend>>> {
    installed()?.all(with_auto_update)
}

/// Drop cached process-wide backend instances
pub fn clear_backend_cache() {
    if let Some(backends) = INSTALLED.read().as_ref() {
        backends.clear_cache();
    }
}
