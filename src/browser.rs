//! Config Browser
//!
//! Façade used by front ends: lists the config folder, tracks the current
//! selection, and runs syncs that refresh what the selection shows.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::cache::{CacheStats, ContentCache, DirectoryLister, ReadFailure};
use crate::config::BrowserConfig;
use crate::remote::{RemoteDownloader, RemoteLister};
use crate::sync::{SyncEngine, SyncError, SyncReport};

/// Text shown before anything is selected
pub const PLACEHOLDER: &str = " - select a file from the list on the left - ";

/// Extension of a config file name: text after the last `.`, empty without one
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[idx + 1..],
        None => "",
    }
}

/// What a selection displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionContent {
    /// File content, possibly empty
    Text(Arc<str>),
    /// The file could not be read
    Unavailable { reason: String },
}

/// A selected config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,
    /// Used by front ends to pick a syntax mode
    pub extension: String,
    pub content: SelectionContent,
}

impl Selection {
    fn load(cache: &ContentCache, name: &str) -> Self {
        let content = match cache.get(name) {
            Ok(text) => SelectionContent::Text(text),
            Err(failure) => SelectionContent::Unavailable {
                reason: failure.to_string(),
            },
        };
        Self {
            name: name.to_string(),
            extension: file_extension(name).to_string(),
            content,
        }
    }

    /// Displayed text; an unreadable file shows as empty
    pub fn text(&self) -> &str {
        match &self.content {
            SelectionContent::Text(text) => &**text,
            SelectionContent::Unavailable { .. } => "",
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.content, SelectionContent::Text(_))
    }
}

/// Result of a sync run through the browser
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub report: SyncReport,
    /// The previous selection, reloaded after the sync
    pub selection: Option<Selection>,
}

/// Browsing session over one config folder
pub struct ConfigBrowser<R> {
    cache: Arc<ContentCache>,
    engine: SyncEngine<R>,
    sync_enabled: bool,
    /// Most recently selected file name
    selection: Mutex<Option<String>>,
}

impl<R> ConfigBrowser<R>
where
    R: RemoteLister + RemoteDownloader,
{
    pub fn new(cache: Arc<ContentCache>, engine: SyncEngine<R>, sync_enabled: bool) -> Self {
        Self {
            cache,
            engine,
            sync_enabled,
            selection: Mutex::new(None),
        }
    }

    /// Build the cache and sync engine for a loaded configuration
    pub fn from_config(config: &BrowserConfig, remote: Arc<R>) -> Self {
        let cache = Arc::new(ContentCache::new(
            config.config_folder.clone(),
            DirectoryLister,
        ));
        let engine = SyncEngine::new(remote, Arc::clone(&cache), &config.sync);
        Self::new(cache, engine, config.sync.enabled)
    }

    /// File names in the config folder
    pub fn list_files(&self) -> Result<Arc<[String]>, ReadFailure> {
        self.cache.list_names()
    }

    /// Rescan the config folder, e.g. after a sync added files
    pub fn rescan(&self) -> Result<Arc<[String]>, ReadFailure> {
        self.cache.forget_names();
        self.cache.list_names()
    }

    /// Select a file and return what it displays
    ///
    /// Always succeeds; an unreadable file yields `SelectionContent::Unavailable`.
    pub fn select(&self, name: &str) -> Selection {
        *self.selection.lock().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
        debug!(name = name, "Selected config file");
        Selection::load(&self.cache, name)
    }

    /// Name of the current selection
    pub fn current_name(&self) -> Option<String> {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current selection, served through the cache
    pub fn current(&self) -> Option<Selection> {
        self.current_name()
            .map(|name| Selection::load(&self.cache, &name))
    }

    /// Whether the sync action is offered
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Sync the config folder and reload the selection that was active before
    pub async fn run_sync(&self) -> Result<SyncOutcome, SyncError> {
        if !self.sync_enabled {
            return Err(SyncError::Disabled);
        }

        let previous = self.current_name();
        info!(
            bucket = %self.engine.bucket(),
            prefix = %self.engine.prefix(),
            selection = ?previous,
            "Running config sync"
        );

        let result = self.engine.run().await;
        self.cache.log_metrics();

        match result {
            Ok(report) => {
                let selection = previous.map(|name| self.select(&name));
                Ok(SyncOutcome { report, selection })
            }
            Err(e) => {
                if let (SyncError::Interrupted { .. }, Some(name)) = (&e, previous) {
                    self.select(&name);
                }
                Err(e)
            }
        }
    }
}
