//! Search configuration via `sift.toml`
//!
//! Lists the configured backends in order. With no `[[backends]]` entries,
//! a single database backend named `default` is used.

use crate::registry::{BackendParams, DEFAULT_BACKEND_NAME, DEFAULT_BACKEND_PATH};
use serde::{Deserialize, Serialize};
use sift_core::{Error, Result};
use std::collections::HashSet;
use std::path::Path;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "sift.toml";

/// Default number of records per reindex batch
pub const DEFAULT_REINDEX_CHUNK_SIZE: usize = 1000;

/// One configured backend
///
/// ```toml
/// [[backends]]
/// name = "default"
/// backend = "sift_search::database"
/// auto_update = true
///
/// [backends.options]
/// k1 = 1.2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Name the backend is looked up by
    pub name: String,
    /// Module path or class path of the backend
    #[serde(alias = "BACKEND")]
    pub backend: String,
    /// Whether record saves and deletes are propagated to this backend
    #[serde(default = "default_auto_update", alias = "AUTO_UPDATE")]
    pub auto_update: bool,
    /// Backend-specific options, passed to its constructor
    #[serde(default, skip_serializing_if = "BackendParams::is_empty")]
    pub options: BackendParams,
}

fn default_auto_update() -> bool {
    true
}

impl BackendConfig {
    /// A backend entry with auto-update enabled and no options
    pub fn new(name: impl Into<String>, backend: impl Into<String>) -> Self {
        BackendConfig {
            name: name.into(),
            backend: backend.into(),
            auto_update: true,
            options: BackendParams::new(),
        }
    }

    /// Builder: enable or disable auto-update
    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }

    /// Builder: set a backend option
    pub fn option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Search configuration loaded from `sift.toml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Records per batch when rebuilding indexes
    #[serde(default = "default_chunk_size")]
    pub reindex_chunk_size: usize,
    /// Configured backends, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backends: Vec<BackendConfig>,
}

fn default_chunk_size() -> usize {
    DEFAULT_REINDEX_CHUNK_SIZE
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            reindex_chunk_size: DEFAULT_REINDEX_CHUNK_SIZE,
            backends: Vec::new(),
        }
    }
}

impl SearchConfig {
    /// Builder: append a backend entry
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backends.push(backend);
        self
    }

    /// Look up a backend entry by name
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }

    /// Check names are unique and non-empty, and the chunk size is positive
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.reindex_chunk_size == 0 {
            return Err(Error::config("reindex_chunk_size must be greater than 0"));
        }
        let mut seen = HashSet::new();
        for entry in &self.backends {
            if entry.name.trim().is_empty() {
                return Err(Error::config("backend name must not be empty"));
            }
            if entry.backend.trim().is_empty() {
                return Err(Error::config(format!(
                    "backend '{}' has no backend path",
                    entry.name
                )));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(Error::config(format!(
                    "backend '{}' is configured more than once",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Sift search configuration
#
# Records per batch when rebuilding indexes (default: 1000)
reindex_chunk_size = 1000

# Backends, looked up by name. "default" is used when no name is given.
# Without any [[backends]] entry, the database backend is used.
#
#   backend     = module path ("sift_search::database") or class path
#                 ("sift_search::database::DatabaseSearchBackend")
#   auto_update = propagate record saves and deletes (default: true)
[[backends]]
name = "default"
backend = "sift_search::database"
auto_update = true

# BM25 parameters of the database backend
# [backends.options]
# k1 = 1.2
# b = 0.75
"#
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SearchConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: SearchConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The entry `name` resolves to, including the implicit default
    pub(crate) fn resolve_entry(&self, name: &str) -> Option<BackendConfig> {
        match self.backend(name) {
            Some(entry) => Some(entry.clone()),
            None if name == DEFAULT_BACKEND_NAME => {
                Some(BackendConfig::new(DEFAULT_BACKEND_NAME, DEFAULT_BACKEND_PATH))
            }
            None => None,
        }
    }
}
