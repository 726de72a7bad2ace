//! Remote store types and traits
//!
//! The sync engine only sees these seams; `S3Store` is the production
//! implementation and tests plug in scripted fakes.

use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::errors::RemoteError;

/// Streamed body of one remote object
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// One page of a remote listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePage {
    /// Object keys in listing order
    pub keys: Vec<String>,
    /// Cursor for the next page, `None` once the listing is exhausted
    pub next_cursor: Option<String>,
}

impl RemotePage {
    /// A page that ends the listing
    pub fn last(keys: Vec<String>) -> Self {
        Self {
            keys,
            next_cursor: None,
        }
    }

    /// A page followed by more pages
    pub fn more(keys: Vec<String>, cursor: impl Into<String>) -> Self {
        Self {
            keys,
            next_cursor: Some(cursor.into()),
        }
    }
}

/// Paginated enumeration of remote objects under a key prefix
#[async_trait]
pub trait RemoteLister: Send + Sync {
    /// Fetch one page; `cursor` is the previous page's `next_cursor`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&str>,
    ) -> Result<RemotePage, RemoteError>;
}

/// Streams the bytes of a single remote object
#[async_trait]
pub trait RemoteDownloader: Send + Sync {
    /// Open the object's body; the caller drains and drops the reader
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectReader, RemoteError>;
}
