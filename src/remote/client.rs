//! S3 Object Store Client
//!
//! Lists and streams objects from an S3 (or S3-compatible) bucket for the
//! config sync. Credentials come from the SDK's default provider chain.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::errors::RemoteError;
use super::types::{ObjectReader, RemoteDownloader, RemoteLister, RemotePage};
use crate::config::SyncSettings;

/// Maximum keys requested per listing page
const MAX_KEYS_PER_PAGE: i32 = 1000;

/// S3 client implementing the remote lister and downloader
///
/// The SDK client is built on first use, so commands that never reach the
/// bucket do not load AWS configuration.
pub struct S3Store {
    /// Region override
    region: Option<String>,
    /// Endpoint override for S3-compatible stores
    endpoint: Option<String>,
    /// Listing delimiter (`/` for a flat listing)
    delimiter: Option<String>,
    /// SDK client, built lazily
    client: OnceCell<Client>,
}

impl S3Store {
    /// Prepare a store from the sync settings without contacting AWS
    pub fn new(settings: &SyncSettings) -> Self {
        Self {
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
            delimiter: settings.delimiter().map(String::from),
            client: OnceCell::new(),
        }
    }

    /// Wrap an existing SDK client
    pub fn from_client(client: Client, delimiter: Option<String>) -> Self {
        Self {
            region: None,
            endpoint: None,
            delimiter,
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> &Client {
        self.client.get_or_init(|| self.connect()).await
    }

    /// Region and endpoint overrides apply on top of the default SDK
    /// configuration. A custom endpoint switches to path-style addressing.
    async fn connect(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &self.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            endpoint = ?self.endpoint,
            region = ?sdk_config.region(),
            "S3 client ready"
        );
        Client::from_conf(builder.build())
    }
}

#[async_trait]
impl RemoteLister for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&str>,
    ) -> Result<RemotePage, RemoteError> {
        let output = self
            .client()
            .await
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(MAX_KEYS_PER_PAGE)
            .set_delimiter(self.delimiter.clone())
            .set_continuation_token(cursor.map(String::from))
            .send()
            .await
            .map_err(RemoteError::from_sdk)?;

        let keys: Vec<String> = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(String::from))
            .collect();
        let next_cursor = output.next_continuation_token().map(String::from);

        debug!(
            bucket = bucket,
            prefix = prefix,
            count = keys.len(),
            more = next_cursor.is_some(),
            "Listed objects from S3"
        );

        Ok(RemotePage { keys, next_cursor })
    }
}

#[async_trait]
impl RemoteDownloader for S3Store {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<ObjectReader, RemoteError> {
        let output = self
            .client()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(RemoteError::from_sdk)?;

        debug!(
            bucket = bucket,
            key = key,
            size = ?output.content_length(),
            "Opened object stream from S3"
        );

        Ok(Box::pin(output.body.into_async_read()))
    }
}
