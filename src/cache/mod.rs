//! Config file caching layer
//!
//! Lists the config folder once and keeps file contents in memory until a
//! sync invalidates them.

pub mod content;
pub mod lister;

pub use content::{CacheStats, ContentCache, ReadFailure};
pub use lister::{DirectoryLister, FileLister};
