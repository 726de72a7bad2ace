//! Sync Engine
//!
//! Pulls every object under the configured prefix into the config folder,
//! overwriting same-named files, then invalidates the content cache.
//! Local files missing from the bucket are never deleted.

use std::collections::HashSet;
use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::{pin_mut, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::naming::{is_safe_file_name, local_file_name};
use super::report::{DownloadError, ObjectFailure, SyncError, SyncReport};
use crate::cache::lister::{is_partial_download, PARTIAL_PREFIX, PARTIAL_SUFFIX};
use crate::cache::ContentCache;
use crate::config::SyncSettings;
use crate::remote::{pages, RemoteDownloader, RemoteLister, RetryPolicy};

/// Mode for newly created config files
const NEW_FILE_MODE: u32 = 0o644;

/// Drives sync passes from a remote store into the config folder
pub struct SyncEngine<R> {
    /// Remote lister and downloader
    remote: Arc<R>,
    /// Cache invalidated after each pass
    cache: Arc<ContentCache>,
    /// Config folder downloads are written to
    destination: PathBuf,
    bucket: String,
    prefix: String,
    /// Retry and timeout policy for page requests
    list_policy: RetryPolicy,
    /// Bound on a single object transfer
    download_timeout: Duration,
    /// Held for the duration of a pass
    pass_lock: Mutex<()>,
}

impl<R> SyncEngine<R>
where
    R: RemoteLister + RemoteDownloader,
{
    /// Create an engine writing into the cache's config folder
    pub fn new(remote: Arc<R>, cache: Arc<ContentCache>, settings: &SyncSettings) -> Self {
        let destination = cache.folder().to_path_buf();
        Self {
            remote,
            cache,
            destination,
            bucket: settings.bucket.clone(),
            prefix: settings.prefix.clone(),
            list_policy: RetryPolicy::new(settings.max_retries, settings.request_timeout()),
            download_timeout: settings.request_timeout(),
            pass_lock: Mutex::new(()),
        }
    }

    /// Replace the page request retry policy
    pub fn with_list_policy(mut self, policy: RetryPolicy) -> Self {
        self.list_policy = policy;
        self
    }

    /// Replace the per-object transfer timeout
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Run one full sync pass
    ///
    /// Per-object failures are recorded in the report. A listing failure
    /// before any object was attempted returns `SyncError::Unavailable` and
    /// leaves the folder and cache untouched; a later listing failure
    /// invalidates the cache and returns `SyncError::Interrupted`.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let _pass = self.pass_lock.lock().await;

        if self.bucket.trim().is_empty() {
            return Err(SyncError::Misconfigured("bucket is empty".into()));
        }

        info!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            destination = %self.destination.display(),
            "Starting config sync"
        );

        let mut report = SyncReport::default();
        let mut written = HashSet::new();

        let stream = pages(
            self.remote.as_ref(),
            &self.bucket,
            &self.prefix,
            self.list_policy,
        );
        pin_mut!(stream);

        while let Some(page) = stream.next().await {
            let page = match page {
                Ok(page) => page,
                Err(e) if report.attempted() == 0 => {
                    error!(bucket = %self.bucket, error = %e, "Remote listing unavailable");
                    return Err(SyncError::Unavailable(e));
                }
                Err(e) => {
                    error!(
                        bucket = %self.bucket,
                        pages = report.pages,
                        attempted = report.attempted(),
                        error = %e,
                        "Remote listing failed mid-sync"
                    );
                    self.cache.invalidate();
                    return Err(SyncError::Interrupted { report, source: e });
                }
            };

            if report.pages == 0 {
                remove_stale_partials(&self.destination);
            }
            report.pages += 1;
            debug!(page = report.pages, keys = page.keys.len(), "Processing listing page");

            for key in &page.keys {
                self.sync_object(key, &mut report, &mut written).await;
            }
        }

        self.cache.invalidate();

        info!(
            pages = report.pages,
            downloaded = report.downloaded.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            bytes = report.bytes,
            "Config sync finished"
        );
        Ok(report)
    }

    async fn sync_object(&self, key: &str, report: &mut SyncReport, written: &mut HashSet<String>) {
        let file_name = local_file_name(key);
        if file_name.is_empty() {
            debug!(key = key, "Skipping folder marker");
            report.skipped.push(key.to_string());
            return;
        }

        if !written.insert(file_name.to_string()) {
            warn!(
                key = key,
                file = file_name,
                "Remote key maps to an already written file, last one wins"
            );
        }

        match self.download(key, file_name).await {
            Ok(bytes) => {
                debug!(key = key, file = file_name, size = bytes, "Downloaded config file");
                report.downloaded.push(file_name.to_string());
                report.bytes += bytes;
            }
            Err(e) => {
                warn!(key = key, file = file_name, error = %e, "Failed to download config file");
                report.failures.push(ObjectFailure {
                    key: key.to_string(),
                    file_name: file_name.to_string(),
                    error: e,
                });
            }
        }
    }

    /// Stream one object into place through a temporary file
    async fn download(&self, key: &str, file_name: &str) -> Result<u64, DownloadError> {
        if !is_safe_file_name(file_name) {
            return Err(DownloadError::UnsafeName(file_name.to_string()));
        }
        let target = self.destination.join(file_name);

        let transfer = async {
            let mut reader = self.remote.fetch(&self.bucket, key).await?;

            let (file, temp_path) = tempfile::Builder::new()
                .prefix(PARTIAL_PREFIX)
                .suffix(PARTIAL_SUFFIX)
                .tempfile_in(&self.destination)?
                .into_parts();
            let mut file = tokio::fs::File::from_std(file);

            let bytes = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            file.set_permissions(target_permissions(&target)).await?;
            drop(file);

            temp_path
                .persist(&target)
                .map_err(|e| DownloadError::Io(e.error.to_string()))?;
            Ok::<_, DownloadError>(bytes)
        };

        match tokio::time::timeout(self.download_timeout, transfer).await {
            Ok(result) => result,
            Err(_) => Err(DownloadError::Timeout),
        }
    }
}

/// Keep the mode of the file being replaced, default for new files
fn target_permissions(target: &Path) -> Permissions {
    fs::metadata(target)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| Permissions::from_mode(NEW_FILE_MODE))
}

/// Remove temporaries left behind by an interrupted process
fn remove_stale_partials(folder: &Path) {
    let Ok(read_dir) = fs::read_dir(folder) else {
        return;
    };
    for entry in read_dir.flatten() {
        let name = entry.file_name();
        if name.to_str().is_some_and(is_partial_download) {
            debug!(path = %entry.path().display(), "Removing stale partial download");
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(path = %entry.path().display(), error = %e, "Failed to remove partial download");
            }
        }
    }
}
