//! Config Browser - browse a configuration folder and refresh it from S3
//!
//! Contents are cached in memory per file until a sync pulls new versions
//! from the bucket and invalidates the cache.

pub mod browser;
pub mod cache;
pub mod config;
pub mod ipc;
pub mod remote;
pub mod sync;

pub use browser::{ConfigBrowser, Selection, SelectionContent};
pub use config::BrowserConfig;
