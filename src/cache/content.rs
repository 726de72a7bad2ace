//! Content Cache Implementation
//!
//! Lazily reads config files from the config folder and serves them from
//! memory until the whole cache is invalidated after a sync.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use moka::sync::Cache;
use tracing::{debug, info, trace, warn};

use super::lister::FileLister;
use crate::sync::naming::is_safe_file_name;

/// Why a config file or the folder listing could not be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadFailure {
    #[error("Failed to read {name}: {message}")]
    Io { name: String, message: String },

    #[error("{name} is not valid UTF-8")]
    NotUtf8 { name: String },

    #[error("{name} is not a file name in the config folder")]
    InvalidName { name: String },

    #[error("Failed to list {folder}: {message}")]
    Listing { folder: String, message: String },
}

/// Counters describing cache activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Calls to `get`
    pub lookups: u64,
    /// Successful reads from disk
    pub reads: u64,
    /// Failed reads from disk
    pub failures: u64,
    /// Number of completed invalidations
    pub generation: u64,
}

/// In-memory cache of config file contents
///
/// An entry never changes once inserted; the only way to refresh contents
/// is `invalidate`, which drops every entry at once.
pub struct ContentCache {
    /// Folder the file names are relative to
    folder: PathBuf,
    /// Source of the file name list
    lister: Box<dyn FileLister>,
    /// Memoized file names
    names: Mutex<Option<Arc<[String]>>>,
    /// File contents by name
    contents: Cache<String, Arc<str>>,
    lookups: AtomicU64,
    reads: AtomicU64,
    failures: AtomicU64,
    generation: AtomicU64,
}

impl ContentCache {
    /// Create a cache over `folder`, listing it through `lister`
    pub fn new(folder: PathBuf, lister: impl FileLister + 'static) -> Self {
        let contents = Cache::builder().name("config_content_cache").build();

        Self {
            folder,
            lister: Box::new(lister),
            names: Mutex::new(None),
            contents,
            lookups: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// The config folder this cache reads from
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// File names in the config folder, listed once and memoized
    ///
    /// A failed listing is not memoized.
    pub fn list_names(&self) -> Result<Arc<[String]>, ReadFailure> {
        let mut names = self.names.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = names.as_ref() {
            trace!(count = cached.len(), "Name list HIT");
            return Ok(Arc::clone(cached));
        }

        let listed: Arc<[String]> = self
            .lister
            .list(&self.folder)
            .map_err(|e| {
                let failure = ReadFailure::Listing {
                    folder: self.folder.display().to_string(),
                    message: e.to_string(),
                };
                warn!(error = %failure, "Failed to list config folder");
                failure
            })?
            .into();

        debug!(folder = %self.folder.display(), count = listed.len(), "Listed config folder");
        *names = Some(Arc::clone(&listed));
        Ok(listed)
    }

    /// Drop the memoized name list so the next `list_names` rescans the folder
    pub fn forget_names(&self) {
        *self.names.lock().unwrap_or_else(PoisonError::into_inner) = None;
        debug!("Forgot memoized name list");
    }

    /// Content of `name`, read from disk on first access
    ///
    /// Concurrent lookups of the same missing name share a single read.
    /// Failures are logged and not cached. Names that would resolve outside
    /// the folder are refused without touching the filesystem.
    pub fn get(&self, name: &str) -> Result<Arc<str>, ReadFailure> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if !is_safe_file_name(name) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            warn!(name = name, "Refusing config file name outside the folder");
            return Err(ReadFailure::InvalidName {
                name: name.to_string(),
            });
        }

        self.contents
            .try_get_with(name.to_string(), || self.read(name))
            .map_err(|failure| {
                warn!(name = name, error = %failure, "Failed to load config file");
                (*failure).clone()
            })
    }

    /// Whether `name` is currently cached
    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.contents.contains_key(name)
    }

    /// Drop every cached content entry; the name list is kept
    pub fn invalidate(&self) {
        self.contents.invalidate_all();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        info!(generation = generation, "Invalidated config content cache");
    }

    fn read(&self, name: &str) -> Result<Arc<str>, ReadFailure> {
        let path = self.folder.join(name);
        trace!(path = %path.display(), "Content cache MISS, reading file");

        let bytes = fs::read(&path).map_err(|e| {
            self.failures.fetch_add(1, Ordering::Relaxed);
            ReadFailure::Io {
                name: name.to_string(),
                message: e.to_string(),
            }
        })?;

        let text = String::from_utf8(bytes).map_err(|_| {
            self.failures.fetch_add(1, Ordering::Relaxed);
            ReadFailure::NotUtf8 {
                name: name.to_string(),
            }
        })?;

        self.reads.fetch_add(1, Ordering::Relaxed);
        debug!(name = name, size = text.len(), "Cached config file");
        Ok(Arc::from(text))
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            generation: self.generation.load(Ordering::Relaxed),
        }
    }

    /// Log current cache metrics
    pub fn log_metrics(&self) {
        let stats = self.stats();
        let hits = stats.lookups.saturating_sub(stats.reads + stats.failures);
        let hit_rate = if stats.lookups > 0 {
            (hits as f64 / stats.lookups as f64) * 100.0
        } else {
            0.0
        };

        debug!(
            lookups = stats.lookups,
            reads = stats.reads,
            failures = stats.failures,
            generation = stats.generation,
            hit_rate = format!("{:.1}%", hit_rate),
            entries = self.contents.entry_count(),
            "Content cache metrics"
        );
    }
}
