//! Disk-backed bytecode cache.
//!
//! One file per source identifier holds the raw bytes the engine produced
//! when it serialized the compiled unit. There is no header; a blob the
//! engine refuses to read is treated as a miss and overwritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use host_api::{JsiError, Result};
use log::debug;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;

/// Lifecycle of one cache entry during a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCacheState {
    /// Nothing loaded.
    Uninitialized,
    /// Bytes were read from disk.
    Initialized,
    /// Fresh bytes wait to be written.
    RequestUpdate,
    /// Fresh bytes were written.
    Updated,
}

/// Bytecode for one source identifier.
#[derive(Debug, Clone)]
pub struct CodeCacheItem {
    data: Vec<u8>,
    state: CodeCacheState,
}

impl CodeCacheItem {
    /// An empty entry.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            state: CodeCacheState::Uninitialized,
        }
    }

    /// Bytecode bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Current state.
    pub fn state(&self) -> CodeCacheState {
        self.state
    }

    /// Replaces the bytes and marks the entry for writing.
    pub fn request_update(&mut self, data: Vec<u8>) {
        self.data = data;
        self.state = CodeCacheState::RequestUpdate;
    }
}

impl Default for CodeCacheItem {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters shared by every runtime using the same cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodeCacheStats {
    /// Loads that found a file.
    pub hits: u64,
    /// Loads that found nothing.
    pub misses: u64,
    /// Successful writes.
    pub writes: u64,
    /// Loaded blobs the engine could not read.
    pub rejected: u64,
}

/// Bytecode cache rooted at one directory.
///
/// Safe to share between runtimes on different threads behind an `Arc`;
/// only the counters are synchronized, not the files.
#[derive(Debug)]
pub struct CodeCache {
    base_dir: PathBuf,
    stats: Mutex<CodeCacheStats>,
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9.-]").expect("cache name regex must compile"))
}

/// File name for a source identifier.
///
/// Every byte outside `[A-Za-z0-9.-]` becomes `_XX` (uppercase hex), `_`
/// included, so distinct identifiers never share a file. The empty
/// identifier maps to `_`, the only name without an escape after its `_`.
///
/// ```
/// use quickjs_runtime::code_cache::sanitize;
///
/// assert_eq!(sanitize("https://x/a.js"), "https_3A_2F_2Fx_2Fa.js");
/// assert_eq!(sanitize("a_b.js"), "a_5Fb.js");
/// assert_eq!(sanitize(".."), "_2E_2E");
/// ```
pub fn sanitize(source_url: &str) -> String {
    match source_url {
        "" => "_".to_string(),
        "." => "_2E".to_string(),
        ".." => "_2E_2E".to_string(),
        _ => unsafe_chars()
            .replace_all(source_url, |caps: &regex::Captures<'_>| {
                caps[0].bytes().map(|b| format!("_{:02X}", b)).collect::<String>()
            })
            .into_owned(),
    }
}

impl CodeCache {
    /// Cache rooted at `base_dir`. The directory is created on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            stats: Mutex::new(CodeCacheStats::default()),
        }
    }

    /// Root directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File holding the bytecode for `source_url`.
    pub fn path_for(&self, source_url: &str) -> PathBuf {
        self.base_dir.join(sanitize(source_url))
    }

    /// Reads the entry for `source_url`.
    ///
    /// A missing or unreadable file yields an uninitialized entry.
    pub fn load(&self, source_url: &str) -> CodeCacheItem {
        let path = self.path_for(source_url);
        match fs::read(&path) {
            Ok(data) if !data.is_empty() => {
                debug!("code cache hit for {} ({} bytes)", source_url, data.len());
                self.stats.lock().hits += 1;
                CodeCacheItem {
                    data,
                    state: CodeCacheState::Initialized,
                }
            }
            Ok(_) | Err(_) => {
                debug!("code cache miss for {}", source_url);
                self.stats.lock().misses += 1;
                CodeCacheItem::new()
            }
        }
    }

    /// Writes an entry marked [`CodeCacheState::RequestUpdate`].
    ///
    /// Entries in any other state are left alone.
    pub fn store(&self, source_url: &str, item: &mut CodeCacheItem) -> Result<()> {
        if item.state != CodeCacheState::RequestUpdate {
            return Ok(());
        }
        let path = self.path_for(source_url);
        let write = |path: &Path| -> io::Result<()> {
            fs::create_dir_all(&self.base_dir)?;
            fs::write(path, &item.data)
        };
        write(&path).map_err(|source| JsiError::CodeCache {
            path: path.clone(),
            source,
        })?;
        debug!("code cache wrote {} bytes to {}", item.data.len(), path.display());
        item.state = CodeCacheState::Updated;
        self.stats.lock().writes += 1;
        Ok(())
    }

    /// Counts a loaded blob the engine refused.
    pub fn record_rejected(&self) {
        self.stats.lock().rejected += 1;
    }

    /// Removes the entry for `source_url`, if present.
    pub fn remove(&self, source_url: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(source_url)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> CodeCacheStats {
        *self.stats.lock()
    }
}
