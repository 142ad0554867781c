//! Runtime configuration.

use std::path::PathBuf;

use host_api::{JsiError, Result};
use serde::{Deserialize, Serialize};

/// Engine limits and bytecode cache location for one runtime.
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes.
///
/// # Examples
///
/// ```
/// use quickjs_runtime::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "code_cache_dir": null }"#).unwrap();
/// assert!(config.code_cache_dir.is_none());
/// assert_eq!(config.max_stack_size, 1024 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory for cached bytecode. `None` disables the cache.
    pub code_cache_dir: Option<PathBuf>,
    /// Maximum native stack the engine may use, in bytes.
    pub max_stack_size: usize,
    /// Heap limit in bytes, if any.
    pub memory_limit: Option<usize>,
    /// Allocation volume that triggers a collection, if overridden.
    pub gc_threshold: Option<usize>,
    /// Engine runtime label, also reported by `description()`.
    pub runtime_info: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            code_cache_dir: Some(std::env::temp_dir().join("quickjs-codecache")),
            max_stack_size: 1024 * 1024 * 1024,
            memory_limit: None,
            gc_threshold: None,
            runtime_info: "QuickJsRuntime".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| JsiError::Config(e.to_string()))
    }

    /// Same configuration with the bytecode cache under `dir`.
    pub fn with_code_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.code_cache_dir = Some(dir.into());
        self
    }

    /// Same configuration with the bytecode cache disabled.
    pub fn without_code_cache(mut self) -> Self {
        self.code_cache_dir = None;
        self
    }
}
